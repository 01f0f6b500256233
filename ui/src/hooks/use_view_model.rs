use std::rc::Rc;

use client::{ClientError, MutationKind, QueryState, ViewModel};
use yew::prelude::*;

/// Hook return type for any view-model.
pub struct ViewModelHandle<V: ViewModel> {
    pub view_model: Rc<V>,
    pub state: QueryState<V::Data>,
    pub refetch: Callback<()>,
}

impl<V: ViewModel + 'static> ViewModelHandle<V> {
    pub fn is_pending(&self, kind: MutationKind) -> bool {
        self.view_model.is_pending(kind)
    }

    /// Render based on query state with contextual loading/error messages.
    ///
    /// The render function receives the data, whether a retry is in
    /// progress, and the error from a failed retry (the previous data is
    /// still shown).
    pub fn render<F>(&self, context: &str, render_fn: F) -> Html
    where
        F: Fn(&V::Data, bool, Option<String>) -> Html,
    {
        let error = self.state.error.as_ref().map(ClientError::user_message);
        match &self.state.data {
            Some(data) => render_fn(data, self.state.loading, error),
            None if self.state.loading => html! {
                <div class="text-center py-12">
                    <p class="text-neutral-600 dark:text-neutral-400">
                        {format!("Loading {context}...")}
                    </p>
                </div>
            },
            None => {
                let onclick = self.refetch.reform(|_: MouseEvent| ());
                html! {
                    <div class="p-4 rounded-md bg-red-50 \
                               dark:bg-red-900/20 border \
                               border-red-200 dark:border-red-800">
                        <p class="text-sm text-red-700 dark:text-red-400">
                            {format!(
                                "Error loading {context}: {}",
                                error.unwrap_or_default()
                            )}
                        </p>
                        <button class="mt-2 text-sm underline" {onclick}>
                            {"Try again"}
                        </button>
                    </div>
                }
            }
        }
    }
}

/// Generic view-model hook.
///
/// Builds the view-model once per `deps`, fetches on mount, re-renders on
/// every state change, and disposes the view-model when `deps` change or
/// the component unmounts.
///
/// # Example
///
/// ```ignore
/// #[hook]
/// pub fn use_comments(post_id: PostId) -> ViewModelHandle<CommentsViewModel<RestClient>> {
///     let context = use_app_context();
///     use_view_model((context, post_id), |(context, post_id)| {
///         CommentsViewModel::new(context.clone(), *post_id)
///     })
/// }
/// ```
#[hook]
pub fn use_view_model<V, D, F>(deps: D, build: F) -> ViewModelHandle<V>
where
    V: ViewModel + 'static,
    D: PartialEq + Clone + 'static,
    F: FnOnce(&D) -> V,
{
    let update = use_force_update();
    let view_model = use_memo(deps.clone(), build);

    {
        let view_model = view_model.clone();
        use_effect_with(deps, move |_| {
            let listener = view_model.subscribe(move || update.force_update());
            yew::platform::spawn_local(view_model.retry());
            move || {
                view_model.unsubscribe(listener);
                view_model.dispose();
            }
        });
    }

    let refetch = {
        let view_model = view_model.clone();
        Callback::from(move |_| yew::platform::spawn_local(view_model.retry()))
    };

    ViewModelHandle {
        state: view_model.state(),
        view_model,
        refetch,
    }
}
