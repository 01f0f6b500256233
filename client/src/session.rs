//! The signed-in identity and the context every view-model is built from.

use std::cell::RefCell;
use std::rc::Rc;

use payloads::{
    AuthStore, AuthUser, DataStore, UserId, requests::PasswordCredentials,
};

use crate::{
    ClientError, ListenerId, QueryOptions, Toasts,
    config::DEFAULT_FEED_PAGE_SIZE, listeners::Listeners,
};

/// A store handle plus the user it is authenticated as.
///
/// Listeners run whenever the user signs in or the session ends.
pub struct Session<S> {
    store: Rc<S>,
    user: RefCell<Option<AuthUser>>,
    listeners: Listeners,
}

impl<S: DataStore> Session<S> {
    /// Ask the store who is signed in. A failed lookup starts signed out.
    pub async fn start(store: Rc<S>) -> Self {
        let user = match store.current_user().await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!("could not restore session: {e}");
                None
            }
        };
        Self::new(store, user)
    }
}

impl<S: AuthStore> Session<S> {
    pub async fn sign_in(
        &self,
        credentials: &PasswordCredentials,
    ) -> Result<AuthUser, ClientError> {
        let user = self.store.sign_in(credentials).await?;
        self.signed_in(user.clone());
        Ok(user)
    }

    /// Register and, if the store issues a session straight away, sign in.
    /// `None` means the account waits on email confirmation.
    pub async fn sign_up(
        &self,
        credentials: &PasswordCredentials,
    ) -> Result<Option<AuthUser>, ClientError> {
        let user = self.store.sign_up(credentials).await?;
        if let Some(user) = &user {
            self.signed_in(user.clone());
        }
        Ok(user)
    }

    /// Revoke the store's session, then end this one. The local session
    /// ends even when revoking fails.
    pub async fn sign_out(&self) -> Result<(), ClientError> {
        let revoked = self.store.sign_out().await;
        if let Err(e) = &revoked {
            tracing::warn!("could not revoke session: {e}");
        }
        self.end();
        revoked.map_err(ClientError::from)
    }
}

impl<S> Session<S> {
    pub fn new(store: Rc<S>, user: Option<AuthUser>) -> Self {
        Self {
            store,
            user: RefCell::new(user),
            listeners: Listeners::default(),
        }
    }

    pub fn store(&self) -> &Rc<S> {
        &self.store
    }

    pub fn user(&self) -> Option<AuthUser> {
        self.user.borrow().clone()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user.borrow().as_ref().map(|user| user.id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.borrow().is_some()
    }

    pub fn require_user(&self) -> Result<AuthUser, ClientError> {
        self.user().ok_or(ClientError::AuthRequired)
    }

    pub fn signed_in(&self, user: AuthUser) {
        tracing::info!(user_id = %user.id, "session started");
        *self.user.borrow_mut() = Some(user);
        self.listeners.notify();
    }

    /// Forget the user locally. Use [`Session::sign_out`] to also drop the
    /// store's credentials.
    pub fn end(&self) {
        let ended = self.user.borrow_mut().take();
        if let Some(user) = ended {
            tracing::info!(user_id = %user.id, "session ended");
            self.listeners.notify();
        }
    }

    pub fn subscribe(&self, listener: impl Fn() + 'static) -> ListenerId {
        self.listeners.add(Rc::new(listener))
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.listeners.remove(id);
    }
}

/// Everything a view-model needs from its surroundings.
pub struct AppContext<S> {
    pub session: Rc<Session<S>>,
    pub toasts: Toasts,
    pub options: QueryOptions,
    pub feed_page_size: usize,
}

impl<S> Clone for AppContext<S> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            toasts: self.toasts.clone(),
            options: self.options,
            feed_page_size: self.feed_page_size,
        }
    }
}

impl<S> PartialEq for AppContext<S> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.session, &other.session)
            && self.toasts == other.toasts
            && self.options == other.options
            && self.feed_page_size == other.feed_page_size
    }
}

impl<S> AppContext<S> {
    pub fn new(session: Rc<Session<S>>, toasts: Toasts) -> Self {
        Self {
            session,
            toasts,
            options: QueryOptions::default(),
            feed_page_size: DEFAULT_FEED_PAGE_SIZE,
        }
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_feed_page_size(mut self, feed_page_size: usize) -> Self {
        self.feed_page_size = feed_page_size;
        self
    }

    pub fn store(&self) -> &Rc<S> {
        self.session.store()
    }
}
