use std::rc::Rc;

use client::{AppContext, ClientConfig, InMemoryBus, Session};
use payloads::{RestClient, UserId};
use yew::prelude::*;

use super::toast::use_toast;

pub type UiContext = AppContext<RestClient>;

/// The bus chat rooms publish on. Compared by identity.
#[derive(Clone, Default)]
pub struct ChatBus(pub Rc<InMemoryBus>);

impl PartialEq for ChatBus {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Who the session is signed in as, re-provided on every sign in and out.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SignedIn(pub Option<UserId>);

#[derive(Properties, PartialEq)]
pub struct SessionProviderProps {
    pub children: Children,
}

/// Restores the store session, then provides the [`UiContext`], the
/// signed-in user and the chat bus to its children. Must sit inside a
/// `ToastProvider`.
#[function_component]
pub fn SessionProvider(props: &SessionProviderProps) -> Html {
    let toasts = use_toast();
    let context = use_state(|| None::<UiContext>);
    let failure = use_state(|| None::<String>);
    let signed_in = use_state(|| SignedIn(None));
    let bus = use_memo((), |_| ChatBus::default());

    {
        let context = context.clone();
        let failure = failure.clone();
        use_effect_with((), move |_| match crate::get_config() {
            Ok(ClientConfig {
                store_url,
                anon_key,
                query,
                feed_page_size,
            }) => {
                let store = Rc::new(RestClient::new(store_url, anon_key));
                yew::platform::spawn_local(async move {
                    let session = Rc::new(Session::start(store).await);
                    context.set(Some(
                        AppContext::new(session, toasts)
                            .with_options(query)
                            .with_feed_page_size(feed_page_size),
                    ));
                });
            }
            Err(e) => {
                tracing::error!("invalid client configuration: {e}");
                failure.set(Some(e.to_string()));
            }
        });
    }

    {
        let signed_in = signed_in.clone();
        use_effect_with((*context).clone(), move |context| {
            let listener = context.as_ref().map(|context| {
                let session = context.session.clone();
                signed_in.set(SignedIn(session.user_id()));
                let id = session.subscribe({
                    let session = Rc::downgrade(&session);
                    move || {
                        if let Some(session) = session.upgrade() {
                            signed_in.set(SignedIn(session.user_id()));
                        }
                    }
                });
                (session, id)
            });
            move || {
                if let Some((session, id)) = listener {
                    session.unsubscribe(id);
                }
            }
        });
    }

    match (&*context, &*failure) {
        (Some(context), _) => html! {
            <ContextProvider<UiContext> context={context.clone()}>
                <ContextProvider<SignedIn> context={*signed_in}>
                    <ContextProvider<ChatBus> context={(*bus).clone()}>
                        {props.children.clone()}
                    </ContextProvider<ChatBus>>
                </ContextProvider<SignedIn>>
            </ContextProvider<UiContext>>
        },
        (None, Some(failure)) => html! {
            <div class="p-4 rounded-md bg-red-50 border border-red-200">
                <p class="text-sm text-red-700">{failure}</p>
            </div>
        },
        (None, None) => html! {
            <div class="text-center py-12">
                <p class="text-neutral-600">{"Loading..."}</p>
            </div>
        },
    }
}

#[hook]
pub fn use_app_context() -> UiContext {
    use_context::<UiContext>()
        .expect("use_app_context must be used within a SessionProvider")
}

#[hook]
pub fn use_signed_in() -> SignedIn {
    use_context::<SignedIn>()
        .expect("use_signed_in must be used within a SessionProvider")
}

#[hook]
pub fn use_chat_bus() -> ChatBus {
    use_context::<ChatBus>()
        .expect("use_chat_bus must be used within a SessionProvider")
}
