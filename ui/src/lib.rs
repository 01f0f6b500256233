use client::{ClientConfig, ConfigError, MutationKind};
use payloads::requests::{NewPost, PasswordCredentials};
use web_sys::{HtmlInputElement, HtmlTextAreaElement};
use yew::prelude::*;

pub mod contexts;
pub mod hooks;
mod logs;

use contexts::{
    SessionProvider, ToastProvider, use_app_context, use_signed_in, use_toast,
};
use hooks::use_feed;

/// Client configuration captured at build time. Without a store url the
/// app talks to the origin it was served from.
pub fn get_config() -> Result<ClientConfig, ConfigError> {
    ClientConfig::from_lookup(|name| {
        build_env(name).map(str::to_string).or_else(|| {
            (name == "CAMPUZBUZZ_STORE_URL")
                .then(same_origin)
                .flatten()
        })
    })
}

fn build_env(name: &str) -> Option<&'static str> {
    match name {
        "CAMPUZBUZZ_STORE_URL" => option_env!("CAMPUZBUZZ_STORE_URL"),
        "CAMPUZBUZZ_ANON_KEY" => option_env!("CAMPUZBUZZ_ANON_KEY"),
        "CAMPUZBUZZ_RETRY_ATTEMPTS" => option_env!("CAMPUZBUZZ_RETRY_ATTEMPTS"),
        "CAMPUZBUZZ_RETRY_DELAY_MS" => option_env!("CAMPUZBUZZ_RETRY_DELAY_MS"),
        "CAMPUZBUZZ_ATTEMPT_TIMEOUT_MS" => {
            option_env!("CAMPUZBUZZ_ATTEMPT_TIMEOUT_MS")
        }
        "CAMPUZBUZZ_FEED_PAGE_SIZE" => option_env!("CAMPUZBUZZ_FEED_PAGE_SIZE"),
        _ => None,
    }
}

fn same_origin() -> Option<String> {
    web_sys::window()?.location().origin().ok()
}

#[function_component]
pub fn App() -> Html {
    use_memo((), |_| {
        if let Err(e) = logs::init_logging() {
            web_sys::console::warn_1(&format!("logging disabled: {e}").into());
        }
    });
    html! {
        <ToastProvider>
            <SessionProvider>
                <div class="min-h-screen bg-white dark:bg-gray-900 text-gray-900 dark:text-gray-100 transition-colors">
                    <main class="max-w-3xl mx-auto px-4 py-8 space-y-6">
                        <AuthPanel />
                        <Feed />
                    </main>
                </div>
            </SessionProvider>
        </ToastProvider>
    }
}

/// Email and password sign in, or a sign out button once signed in.
#[function_component]
fn AuthPanel() -> Html {
    let context = use_app_context();
    let signed_in = use_signed_in();
    let toasts = use_toast();
    let email = use_node_ref();
    let password = use_node_ref();

    if signed_in.0.is_some() {
        let onclick = {
            let session = context.session.clone();
            Callback::from(move |_: MouseEvent| {
                let session = session.clone();
                yew::platform::spawn_local(async move {
                    if let Err(e) = session.sign_out().await {
                        tracing::debug!("sign out finished locally: {e}");
                    }
                });
            })
        };
        return html! {
            <div class="flex justify-end">
                <button {onclick} class="text-sm underline">{"Sign out"}</button>
            </div>
        };
    }

    let onclick = {
        let email = email.clone();
        let password = password.clone();
        let session = context.session.clone();
        Callback::from(move |_: MouseEvent| {
            let (Some(email), Some(password)) = (
                email.cast::<HtmlInputElement>(),
                password.cast::<HtmlInputElement>(),
            ) else {
                return;
            };
            let credentials = PasswordCredentials {
                email: email.value().trim().to_string(),
                password: password.value(),
            };
            let session = session.clone();
            let toasts = toasts.clone();
            yew::platform::spawn_local(async move {
                match session.sign_in(&credentials).await {
                    Ok(_) => password.set_value(""),
                    Err(e) => {
                        toasts.error(format!("Could not sign in: {}", e.user_message()));
                    }
                }
            });
        })
    };

    html! {
        <div class="flex gap-2">
            <input ref={email} type="email" placeholder="Email"
                class="flex-1 rounded-md border p-2" />
            <input ref={password} type="password" placeholder="Password"
                class="flex-1 rounded-md border p-2" />
            <button {onclick} class="rounded-md bg-blue-600 px-4 py-2 text-white">
                {"Sign in"}
            </button>
        </div>
    }
}

#[function_component]
fn Feed() -> Html {
    let feed = use_feed();
    let draft = use_node_ref();

    let on_post = {
        let draft = draft.clone();
        let view_model = feed.view_model.clone();
        Callback::from(move |_: MouseEvent| {
            let Some(input) = draft.cast::<HtmlTextAreaElement>() else {
                return;
            };
            let post = NewPost {
                content: input.value(),
                image_url: None,
                community_id: None,
            };
            let view_model = view_model.clone();
            yew::platform::spawn_local(async move {
                if view_model.create_post(post).await.is_ok() {
                    input.set_value("");
                }
            });
        })
    };
    let posting = feed.is_pending(MutationKind::Create);

    let like = {
        let view_model = feed.view_model.clone();
        Callback::from(move |post_id| {
            let view_model = view_model.clone();
            yew::platform::spawn_local(async move {
                // The view-model has already reverted and toasted.
                if let Err(e) = view_model.toggle_like(post_id).await {
                    tracing::debug!(%post_id, "like not saved: {e}");
                }
            });
        })
    };
    let liking = feed.is_pending(MutationKind::Toggle);

    html! {
        <div class="space-y-6">
            <div class="space-y-2">
                <textarea ref={draft} class="w-full rounded-md border p-2"
                    placeholder="What's happening on campus?" />
                <button onclick={on_post} disabled={posting}
                    class="rounded-md bg-blue-600 px-4 py-2 text-white">
                    {if posting { "Posting..." } else { "Post" }}
                </button>
            </div>
            {feed.render("posts", |posts, refreshing, error| html! {
                <div class="space-y-4">
                    {if refreshing {
                        html! { <span class="text-sm">{"Refreshing..."}</span> }
                    } else {
                        html! {}
                    }}
                    {if let Some(error) = error {
                        html! { <div class="text-sm text-red-700">{error}</div> }
                    } else {
                        html! {}
                    }}
                    {for posts.iter().map(|post| {
                        let post_id = post.id;
                        let onclick = like.reform(move |_: MouseEvent| post_id);
                        html! {
                            <article key={post_id.to_string()} class="rounded-md border p-4">
                                <p class="font-semibold">{&post.author.display_name}</p>
                                <p>{&post.content}</p>
                                <button {onclick} disabled={liking} class="mt-2 text-sm">
                                    {format!(
                                        "{} {}",
                                        if post.is_liked { "♥" } else { "♡" },
                                        post.likes_count
                                    )}
                                </button>
                            </article>
                        }
                    })}
                </div>
            })}
        </div>
    }
}
