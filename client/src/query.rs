//! Reads with bounded automatic retry.
//!
//! A [`RetryableQuery`] runs its producer, retrying failures after a constant
//! delay until the attempt budget is spent. Each `retry()` takes a new ticket;
//! a sequence only applies its outcome while its ticket is still current, so
//! late results from a superseded or disposed sequence are dropped.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::FutureExt;
use futures::future::{self, AbortHandle, Abortable, LocalBoxFuture};

use crate::listeners::{ListenerId, Listeners};
use crate::timer::{sleep, with_timeout};
use crate::{ClientError, QueryOptions};

/// The future that drives one attempt sequence. Spawn it on the local
/// executor or await it.
pub type QueryRun = LocalBoxFuture<'static, ()>;

type Producer<T> = Box<dyn Fn() -> LocalBoxFuture<'static, Result<T, ClientError>>>;

#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    /// Last successfully fetched value. Kept when a later sequence fails.
    pub data: Option<T>,
    pub loading: bool,
    /// Error from the most recent exhausted sequence.
    pub error: Option<ClientError>,
    /// Zero-based attempt within the current sequence.
    pub attempt: u32,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: true,
            error: None,
            attempt: 0,
        }
    }
}

impl<T> QueryState<T> {
    /// Returns true if this is the initial load (data not yet fetched,
    /// currently loading, and no error).
    pub fn is_initial_loading(&self) -> bool {
        self.loading && self.data.is_none() && self.error.is_none()
    }

    /// Data is present but a refresh is running or has failed.
    pub fn is_stale(&self) -> bool {
        self.data.is_some() && (self.loading || self.error.is_some())
    }
}

struct Inner<T> {
    state: RefCell<QueryState<T>>,
    producer: Producer<T>,
    options: QueryOptions,
    ticket: Cell<u64>,
    disposed: Cell<bool>,
    running: RefCell<Option<AbortHandle>>,
    listeners: Listeners,
}

impl<T> Inner<T> {
    fn is_current(&self, ticket: u64) -> bool {
        !self.disposed.get() && self.ticket.get() == ticket
    }

    fn update(&self, f: impl FnOnce(&mut QueryState<T>)) {
        f(&mut self.state.borrow_mut());
        self.listeners.notify();
    }
}

pub struct RetryableQuery<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for RetryableQuery<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> RetryableQuery<T> {
    /// Create a query in the loading state. Nothing runs until `retry()` is
    /// called.
    pub fn new<F, Fut>(options: QueryOptions, producer: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = Result<T, ClientError>> + 'static,
    {
        Self {
            inner: Rc::new(Inner {
                state: RefCell::new(QueryState::default()),
                producer: Box::new(move || producer().boxed_local()),
                options,
                ticket: Cell::new(0),
                disposed: Cell::new(false),
                running: RefCell::new(None),
                listeners: Listeners::default(),
            }),
        }
    }

    pub fn options(&self) -> QueryOptions {
        self.inner.options
    }

    pub fn state(&self) -> QueryState<T>
    where
        T: Clone,
    {
        self.inner.state.borrow().clone()
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&QueryState<T>) -> R) -> R {
        f(&self.inner.state.borrow())
    }

    pub fn data(&self) -> Option<T>
    where
        T: Clone,
    {
        self.inner.state.borrow().data.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    pub fn error(&self) -> Option<ClientError> {
        self.inner.state.borrow().error.clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Start a fresh attempt sequence from attempt zero.
    ///
    /// `loading` is set before this returns. Any sequence still running is
    /// cancelled and its results will never be applied.
    pub fn retry(&self) -> QueryRun {
        let inner = self.inner.clone();
        if inner.disposed.get() {
            return future::ready(()).boxed_local();
        }

        let ticket = inner.ticket.get() + 1;
        inner.ticket.set(ticket);
        if let Some(previous) = inner.running.borrow_mut().take() {
            tracing::debug!(ticket, "superseding running query");
            previous.abort();
        }
        inner.update(|state| {
            state.loading = true;
            state.error = None;
            state.attempt = 0;
        });

        let (handle, registration) = AbortHandle::new_pair();
        *inner.running.borrow_mut() = Some(handle);
        Abortable::new(run_sequence(inner, ticket), registration)
            .map(|_| ())
            .boxed_local()
    }

    /// Stop the query for good: cancels any pending retry timer, suppresses
    /// every later state update, and drops listeners.
    pub fn dispose(&self) {
        self.inner.disposed.set(true);
        if let Some(running) = self.inner.running.borrow_mut().take() {
            running.abort();
        }
        self.inner.listeners.clear();
    }

    pub fn subscribe(&self, listener: impl Fn() + 'static) -> ListenerId {
        self.inner.listeners.add(Rc::new(listener))
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.inner.listeners.remove(id);
    }

    /// Edit fetched data in place. Returns `None` without calling `f` when
    /// nothing has been fetched yet or the query is disposed.
    pub fn update_data<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        if self.is_disposed() {
            return None;
        }
        let result = self.inner.state.borrow_mut().data.as_mut().map(f);
        if result.is_some() {
            self.inner.listeners.notify();
        }
        result
    }

    /// Like [`update_data`](Self::update_data), but starts from
    /// `T::default()` when nothing has been fetched yet.
    pub fn update_data_or_default<R>(
        &self,
        f: impl FnOnce(&mut T) -> R,
    ) -> Option<R>
    where
        T: Default,
    {
        if self.is_disposed() {
            return None;
        }
        let result = f(self
            .inner
            .state
            .borrow_mut()
            .data
            .get_or_insert_with(T::default));
        self.inner.listeners.notify();
        Some(result)
    }

    pub(crate) fn notify(&self) {
        if !self.is_disposed() {
            self.inner.listeners.notify();
        }
    }
}

async fn run_sequence<T>(inner: Rc<Inner<T>>, ticket: u64) {
    let options = inner.options;
    let mut attempt = 0;
    loop {
        let outcome =
            with_timeout((inner.producer)(), options.attempt_timeout).await;
        if !inner.is_current(ticket) {
            tracing::debug!(ticket, "discarding result of superseded query");
            return;
        }

        match outcome {
            Ok(data) => {
                tracing::debug!(ticket, attempt, "query succeeded");
                inner.update(|state| {
                    state.data = Some(data);
                    state.loading = false;
                    state.error = None;
                    state.attempt = attempt;
                });
                inner.running.borrow_mut().take();
                return;
            }
            Err(error) if attempt < options.retry_attempts => {
                tracing::warn!(
                    ticket,
                    attempt,
                    retry_attempts = options.retry_attempts,
                    "query attempt failed, retrying: {error}"
                );
                attempt += 1;
                if !options.retry_delay.is_zero() {
                    sleep(options.retry_delay).await;
                }
                if !inner.is_current(ticket) {
                    return;
                }
                inner.update(|state| state.attempt = attempt);
            }
            Err(error) => {
                tracing::error!(
                    ticket,
                    attempt,
                    "query failed after {} attempts: {error}",
                    attempt + 1
                );
                inner.update(|state| {
                    state.loading = false;
                    state.error = Some(error);
                    state.attempt = attempt;
                });
                inner.running.borrow_mut().take();
                return;
            }
        }
    }
}
