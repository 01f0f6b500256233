//! Writes reconciled against a cached collection.
//!
//! Creates, updates and deletes wait for the store and then patch the cache.
//! Toggles patch the cache first and put back the exact previous values if
//! the write fails. Mutations never retry: the first failure raises an error
//! toast and is returned to the caller.

use std::cell::Cell;
use std::rc::Rc;

use payloads::{AuthUser, StoreError, requests::ValidationError};

use crate::collection::{Collection, Record, Toggle};
use crate::{ClientError, RetryableQuery, Session, Toasts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
    Toggle,
}

impl MutationKind {
    fn index(self) -> usize {
        match self {
            MutationKind::Create => 0,
            MutationKind::Update => 1,
            MutationKind::Delete => 2,
            MutationKind::Toggle => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPhase {
    Idle,
    Pending,
}

/// Writes in flight per kind. Duplicate submissions are neither queued nor
/// merged, so a kind stays pending until all of its writes have finished.
#[derive(Debug, Default)]
pub struct MutationState {
    in_flight: [Cell<u32>; 4],
}

impl MutationState {
    pub fn phase(&self, kind: MutationKind) -> MutationPhase {
        if self.in_flight[kind.index()].get() > 0 {
            MutationPhase::Pending
        } else {
            MutationPhase::Idle
        }
    }

    pub fn is_pending(&self, kind: MutationKind) -> bool {
        self.phase(kind) == MutationPhase::Pending
    }
}

/// Marks a kind pending for as long as it is alive, including when the
/// action future is dropped mid-write.
struct PendingGuard {
    state: Rc<MutationState>,
    kind: MutationKind,
    notify: Box<dyn Fn()>,
}

impl PendingGuard {
    fn new(
        state: Rc<MutationState>,
        kind: MutationKind,
        notify: Box<dyn Fn()>,
    ) -> Self {
        let count = &state.in_flight[kind.index()];
        count.set(count.get() + 1);
        notify();
        Self {
            state,
            kind,
            notify,
        }
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let count = &self.state.in_flight[self.kind.index()];
        count.set(count.get().saturating_sub(1));
        (self.notify)();
    }
}

pub struct OptimisticMutation<C> {
    query: RetryableQuery<C>,
    state: Rc<MutationState>,
    toasts: Toasts,
}

impl<C> Clone for OptimisticMutation<C> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            state: self.state.clone(),
            toasts: self.toasts.clone(),
        }
    }
}

type ItemId<C> = <<C as Collection>::Item as Record>::Id;

impl<C: Collection> OptimisticMutation<C> {
    pub fn new(query: RetryableQuery<C>, toasts: Toasts) -> Self {
        Self {
            query,
            state: Rc::new(MutationState::default()),
            toasts,
        }
    }

    pub fn query(&self) -> &RetryableQuery<C> {
        &self.query
    }

    pub fn toasts(&self) -> &Toasts {
        &self.toasts
    }

    pub fn is_pending(&self, kind: MutationKind) -> bool {
        self.state.is_pending(kind)
    }

    pub fn phase(&self, kind: MutationKind) -> MutationPhase {
        self.state.phase(kind)
    }

    fn begin(&self, kind: MutationKind) -> PendingGuard {
        let query = self.query.clone();
        PendingGuard::new(
            self.state.clone(),
            kind,
            Box::new(move || query.notify()),
        )
    }

    /// Run `write` and put the record it returns at the front of the
    /// collection.
    pub async fn create(
        &self,
        action: &str,
        write: impl Future<Output = Result<C::Item, ClientError>>,
    ) -> Result<C::Item, ClientError> {
        let _pending = self.begin(MutationKind::Create);
        match write.await {
            Ok(item) => {
                tracing::debug!(id = %item.id(), "{action}: created");
                self.query
                    .update_data_or_default(|data| data.insert_front(item.clone()));
                Ok(item)
            }
            Err(e) => Err(self.fail(action, e)),
        }
    }

    /// Flip the record's flag right away, then run `write` with the new
    /// value. A failed write restores the previous flag and count.
    pub async fn toggle<F, Fut>(
        &self,
        action: &str,
        id: ItemId<C>,
        write: F,
    ) -> Result<(), ClientError>
    where
        C::Item: Toggle,
        F: FnOnce(bool) -> Fut,
        Fut: Future<Output = Result<(), ClientError>>,
    {
        let snapshot = self
            .query
            .update_data(|data| {
                data.find_mut(id).map(|item| {
                    let before = (item.toggled(), item.count());
                    item.flip();
                    before
                })
            })
            .flatten();
        let Some((was_toggled, count)) = snapshot else {
            return Err(self.reject(
                action,
                ValidationError::Invalid("That item is no longer available.")
                    .into(),
            ));
        };

        let _pending = self.begin(MutationKind::Toggle);
        match write(!was_toggled).await {
            Ok(()) => {
                tracing::debug!(%id, toggled = !was_toggled, "{action}: saved");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(%id, "{action}: reverting toggle");
                self.query.update_data(|data| {
                    if let Some(item) = data.find_mut(id) {
                        item.set_toggle(was_toggled, count);
                    }
                });
                Err(self.fail(action, e))
            }
        }
    }

    /// Run `write` and merge what it returns into the record with `id`.
    pub async fn update<U>(
        &self,
        action: &str,
        id: ItemId<C>,
        write: impl Future<Output = Result<U, ClientError>>,
        merge: impl FnOnce(&mut C::Item, U),
    ) -> Result<(), ClientError> {
        let _pending = self.begin(MutationKind::Update);
        match write.await {
            Ok(changes) => {
                tracing::debug!(%id, "{action}: updated");
                self.query.update_data(|data| {
                    if let Some(item) = data.find_mut(id) {
                        merge(item, changes);
                    }
                });
                Ok(())
            }
            Err(e) => Err(self.fail(action, e)),
        }
    }

    /// Run `write` and drop the record with `id` from the collection.
    pub async fn delete(
        &self,
        action: &str,
        id: ItemId<C>,
        write: impl Future<Output = Result<(), ClientError>>,
    ) -> Result<(), ClientError> {
        let _pending = self.begin(MutationKind::Delete);
        match write.await {
            Ok(()) => {
                tracing::debug!(%id, "{action}: deleted");
                self.query.update_data(|data| data.remove(id));
                Ok(())
            }
            Err(e) => Err(self.fail(action, e)),
        }
    }

    /// Apply a record that arrived from elsewhere, with no write.
    pub fn receive(&self, item: C::Item) {
        self.query.update_data_or_default(|data| data.upsert(item));
    }

    pub fn forget(&self, id: ItemId<C>) {
        self.query.update_data(|data| data.remove(id));
    }

    /// Check the acting user and the draft before anything is written.
    pub fn authorize<S>(
        &self,
        action: &str,
        session: &Session<S>,
        validation: Result<(), ValidationError>,
    ) -> Result<AuthUser, ClientError> {
        let user = session.require_user().map_err(|e| self.reject(action, e))?;
        validation.map_err(|e| self.reject(action, e.into()))?;
        Ok(user)
    }

    /// Report an error caught before any write. Pending state is untouched.
    pub fn reject(&self, action: &str, error: ClientError) -> ClientError {
        tracing::debug!("{action}: rejected: {error}");
        self.toasts.error(failure_message(action, &error));
        error
    }

    fn fail(&self, action: &str, error: ClientError) -> ClientError {
        tracing::error!("{action} failed: {error}");
        self.toasts.error(failure_message(action, &error));
        error
    }
}

fn failure_message(action: &str, error: &ClientError) -> String {
    if error.is_local() {
        format!("Could not {action}: {}", error.user_message())
    } else {
        format!("Could not {action}. Please try again.")
    }
}

/// Treat a unique-constraint rejection as success, for writes that are
/// idempotent by nature such as inserting a join row.
pub fn tolerate_conflict<T>(
    result: Result<T, StoreError>,
) -> Result<(), StoreError> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.is_conflict() => {
            tracing::debug!("ignoring conflict: {e}");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
