pub mod mock;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use client::{
    AppContext, ClientError, InMemoryBus, QueryOptions, Session, ToastType,
    Toasts, telemetry,
};
use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use payloads::{
    AuthUser, PostId, StoreError, UserId,
    requests::{CommunityInsert, PostInsert},
    responses::{Community, Post, PostLike, Profile},
};
use serde_json::json;
use tokio::time::Instant;

pub use mock::{AUTH, MockStore, StoreOp};

/// Install a quiet subscriber. `RUST_LOG` turns logs up for a test run.
/// Only the first call installs it; later calls find a global default set.
pub fn init_test_logging() {
    let subscriber = telemetry::get_subscriber("error".into());
    let _ = telemetry::init_subscriber(subscriber);
}

/// A signed-out client wired to a fresh [`MockStore`].
pub struct TestApp {
    pub store: Rc<MockStore>,
    pub session: Rc<Session<MockStore>>,
    pub toasts: Toasts,
    pub bus: Rc<InMemoryBus>,
}

/// Build a [`TestApp`]. Queries run once with no retry delay unless a test
/// asks for other options through [`TestApp::context_with`].
pub fn spawn_app() -> TestApp {
    init_test_logging();
    let store = Rc::new(MockStore::new());
    TestApp {
        session: Rc::new(Session::new(store.clone(), None)),
        store,
        toasts: Toasts::new(),
        bus: Rc::new(InMemoryBus::new()),
    }
}

impl TestApp {
    pub fn context(&self) -> AppContext<MockStore> {
        self.context_with(QueryOptions::once())
    }

    pub fn context_with(&self, options: QueryOptions) -> AppContext<MockStore> {
        AppContext::new(self.session.clone(), self.toasts.clone())
            .with_options(options)
    }

    /// Seed a profile for a new user.
    pub fn create_user(&self, username: &str, full_name: Option<&str>) -> Profile {
        self.store.seed(&json!({
            "id": UserId::new(),
            "username": username,
            "full_name": full_name,
            "interests": [],
            "is_mentor": false,
        }))
    }

    pub fn create_mentor(
        &self,
        username: &str,
        department: &str,
        interests: &[&str],
    ) -> Profile {
        self.store.seed(&json!({
            "id": UserId::new(),
            "username": username,
            "full_name": null,
            "department": department,
            "interests": interests,
            "is_mentor": true,
        }))
    }

    /// Sign in as the user a profile belongs to, on both the store and the
    /// session.
    pub fn sign_in(&self, profile: &Profile) -> AuthUser {
        let user = AuthUser {
            id: profile.id,
            email: Some(format!("{}@campus.example.edu", profile.username)),
        };
        self.store.set_user(Some(user.clone()));
        self.session.signed_in(user.clone());
        user
    }

    /// Create Alice's profile and sign in as her.
    pub fn sign_in_as_alice(&self) -> Profile {
        let alice = self.create_user("alice", Some("Alice Liddell"));
        self.sign_in(&alice);
        alice
    }

    pub fn seed_post(&self, author_id: UserId, content: &str) -> Post {
        self.store.seed(&PostInsert {
            author_id,
            content: content.to_string(),
            image_url: None,
            community_id: None,
        })
    }

    pub fn seed_like(&self, post_id: PostId, user_id: UserId) {
        self.store.seed::<PostLike>(&PostLike { post_id, user_id });
    }

    pub fn seed_community(&self, created_by: UserId, name: &str) -> Community {
        self.store.seed(&CommunityInsert {
            name: name.to_string(),
            description: None,
            created_by,
            member_count: 1,
        })
    }

    fn toasts_of(&self, toast_type: ToastType) -> Vec<String> {
        self.toasts
            .snapshot()
            .into_iter()
            .filter(|toast| toast.toast_type == toast_type)
            .map(|toast| toast.message)
            .collect()
    }

    pub fn error_toasts(&self) -> Vec<String> {
        self.toasts_of(ToastType::Error)
    }

    pub fn success_toasts(&self) -> Vec<String> {
        self.toasts_of(ToastType::Success)
    }
}

enum Step<T> {
    Ready(Result<T, ClientError>),
    Gated(oneshot::Receiver<Result<T, ClientError>>),
}

/// A query producer that plays back a fixed script of results and records
/// when it was invoked. Once the script runs out every call fails.
pub struct ScriptedProducer<T> {
    script: Rc<RefCell<VecDeque<Step<T>>>>,
    invocations: Rc<Cell<usize>>,
    invoked_at: Rc<RefCell<Vec<Instant>>>,
}

impl<T> Clone for ScriptedProducer<T> {
    fn clone(&self) -> Self {
        Self {
            script: self.script.clone(),
            invocations: self.invocations.clone(),
            invoked_at: self.invoked_at.clone(),
        }
    }
}

impl<T: 'static> ScriptedProducer<T> {
    pub fn new(results: impl IntoIterator<Item = Result<T, ClientError>>) -> Self {
        Self {
            script: Rc::new(RefCell::new(
                results.into_iter().map(Step::Ready).collect(),
            )),
            invocations: Rc::new(Cell::new(0)),
            invoked_at: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Append a step that stays pending until the returned sender fires.
    pub fn gated(&self) -> oneshot::Sender<Result<T, ClientError>> {
        let (sender, receiver) = oneshot::channel();
        self.script.borrow_mut().push_back(Step::Gated(receiver));
        sender
    }

    pub fn invocations(&self) -> usize {
        self.invocations.get()
    }

    pub fn invoked_at(&self) -> Vec<Instant> {
        self.invoked_at.borrow().clone()
    }

    pub fn producer(
        &self,
    ) -> impl Fn() -> LocalBoxFuture<'static, Result<T, ClientError>> + use<T>
    {
        let this = self.clone();
        move || -> LocalBoxFuture<'static, Result<T, ClientError>> {
            this.invocations.set(this.invocations.get() + 1);
            this.invoked_at.borrow_mut().push(Instant::now());
            match this.script.borrow_mut().pop_front() {
                Some(Step::Ready(result)) => {
                    futures::future::ready(result).boxed_local()
                }
                Some(Step::Gated(receiver)) => async move {
                    receiver.await.unwrap_or_else(|_| {
                        Err(StoreError::Network("gate dropped".into()).into())
                    })
                }
                .boxed_local(),
                None => futures::future::ready(Err(StoreError::Network(
                    "script exhausted".into(),
                )
                .into()))
                .boxed_local(),
            }
        }
    }
}

/// Shorthand for a store-side failure in a script.
pub fn network_error<T>() -> Result<T, ClientError> {
    Err(StoreError::Network("connection reset".into()).into())
}
