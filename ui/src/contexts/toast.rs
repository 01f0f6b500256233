use std::cell::RefCell;
use std::collections::HashSet;

use client::{ToastType, Toasts};
use uuid::Uuid;
use yew::prelude::*;

pub type ToastContext = Toasts;

#[derive(Properties, PartialEq)]
pub struct ToastProviderProps {
    pub children: Children,
}

/// Shares one [`Toasts`] list with every view-model below it and renders
/// the visible toasts.
#[function_component]
pub fn ToastProvider(props: &ToastProviderProps) -> Html {
    let toasts = use_memo((), |_| Toasts::new());
    let update = use_force_update();

    {
        let toasts = (*toasts).clone();
        use_effect_with((), move |_| {
            let scheduled = RefCell::new(HashSet::<Uuid>::new());
            let listener = {
                let handle = toasts.clone();
                toasts.subscribe(move || {
                    schedule_dismissals(&handle, &scheduled);
                    update.force_update();
                })
            };
            move || toasts.unsubscribe(listener)
        });
    }

    let dismiss = {
        let toasts = (*toasts).clone();
        Callback::from(move |id: Uuid| toasts.remove(id))
    };

    html! {
        <ContextProvider<ToastContext> context={(*toasts).clone()}>
            {props.children.clone()}
            <div class="fixed top-4 right-4 z-50 space-y-2">
                {for toasts.snapshot().into_iter().map(|toast| {
                    let id = toast.id;
                    let onclick = dismiss.reform(move |_: MouseEvent| id);
                    let class = match toast.toast_type {
                        ToastType::Error => "bg-red-600 text-white",
                        ToastType::Success => "bg-green-600 text-white",
                        ToastType::Info => "bg-blue-600 text-white",
                    };
                    html! {
                        <div key={id.to_string()}
                            class={classes!("rounded-md", "px-4", "py-3", "shadow", class)}>
                            <span>{toast.message}</span>
                            <button class="ml-3" {onclick}>{"×"}</button>
                        </div>
                    }
                })}
            </div>
        </ContextProvider<ToastContext>>
    }
}

/// Start a dismissal timer for every timed toast not seen before.
fn schedule_dismissals(toasts: &Toasts, scheduled: &RefCell<HashSet<Uuid>>) {
    let visible = toasts.snapshot();
    let mut scheduled = scheduled.borrow_mut();
    scheduled.retain(|id| visible.iter().any(|toast| toast.id == *id));

    for toast in visible {
        let Some(duration_ms) = toast.duration else {
            continue;
        };
        if !scheduled.insert(toast.id) {
            continue;
        }
        let toasts = toasts.clone();
        yew::platform::spawn_local(async move {
            gloo_timers::future::TimeoutFuture::new(duration_ms).await;
            toasts.remove(toast.id);
        });
    }
}

#[hook]
pub fn use_toast() -> Toasts {
    use_context::<ToastContext>()
        .expect("use_toast must be used within a ToastProvider")
}
