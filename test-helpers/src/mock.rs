//! In-memory stand-in for the hosted store.
//!
//! Rows are kept per table as JSON, filtered and ordered with the same
//! [`Query`] semantics the REST client sends. Server-assigned fields (`id`,
//! `created_at`) are filled in on insert from a deterministic clock, unique
//! keys are enforced, and failures can be scripted per operation and table.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use jiff::{Span, Timestamp};
use payloads::{
    AuthStore, AuthUser, DataStore, Filter, Query, Row, StoreError, Table,
    UserId, requests::PasswordCredentials, store,
};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Select,
    Insert,
    Update,
    Delete,
    Auth,
}

/// Pseudo-table the auth calls are counted and failed under.
pub const AUTH: &str = "auth";

/// Tables whose rows get a generated `id` when inserted without one.
const GENERATED_IDS: &[&str] = &[
    "posts",
    "comments",
    "communities",
    "mentorship_requests",
    "chat_messages",
];

fn unique_keys(table: &str) -> &'static [&'static str] {
    match table {
        "post_likes" => &["post_id", "user_id"],
        "community_members" => &["community_id", "user_id"],
        _ => &["id"],
    }
}

pub struct MockStore {
    tables: RefCell<HashMap<String, Vec<Row>>>,
    failures: RefCell<Vec<(StoreOp, String, StoreError)>>,
    calls: RefCell<HashMap<(StoreOp, String), usize>>,
    user: RefCell<Option<AuthUser>>,
    accounts: RefCell<HashMap<String, (String, AuthUser)>>,
    clock: Cell<Timestamp>,
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            tables: RefCell::new(HashMap::new()),
            failures: RefCell::new(Vec::new()),
            calls: RefCell::new(HashMap::new()),
            user: RefCell::new(None),
            accounts: RefCell::new(HashMap::new()),
            clock: Cell::new(
                "2025-01-01T00:00:00Z"
                    .parse()
                    .expect("valid start timestamp"),
            ),
        }
    }

    /// Make the next `op` on `table` fail with `error`. Queued failures are
    /// used up in the order they were added.
    pub fn fail_next(&self, op: StoreOp, table: &str, error: StoreError) {
        self.failures
            .borrow_mut()
            .push((op, table.to_string(), error));
    }

    /// How many times `op` has been called on `table`, failures included.
    pub fn calls(&self, op: StoreOp, table: &str) -> usize {
        self.calls
            .borrow()
            .get(&(op, table.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn set_user(&self, user: Option<AuthUser>) {
        *self.user.borrow_mut() = user;
    }

    /// Register an account that can sign in with `password`.
    pub fn register(&self, email: &str, password: &str, id: UserId) -> AuthUser {
        let user = AuthUser {
            id,
            email: Some(email.to_string()),
        };
        self.accounts
            .borrow_mut()
            .insert(email.to_string(), (password.to_string(), user.clone()));
        user
    }

    /// The timestamp the next inserted row will get.
    pub fn now(&self) -> Timestamp {
        self.clock.get()
    }

    /// Insert a row directly, bypassing failures and call counts.
    pub fn seed<T: Table>(&self, row: &impl Serialize) -> T {
        let row = store::encode(row).expect("seed row encodes");
        let row = self.stamp(T::NAME, row);
        self.tables
            .borrow_mut()
            .entry(T::NAME.to_string())
            .or_default()
            .push(row.clone());
        store::decode(row).expect("seed row decodes")
    }

    /// Every row of `T`'s table, in insertion order.
    pub fn rows<T: Table>(&self) -> Vec<T> {
        self.tables
            .borrow()
            .get(T::NAME)
            .into_iter()
            .flatten()
            .map(|row| store::decode(row.clone()).expect("stored row decodes"))
            .collect()
    }

    pub fn count(&self, table: &str) -> usize {
        self.tables.borrow().get(table).map_or(0, Vec::len)
    }

    fn record(&self, op: StoreOp, table: &str) -> Result<(), StoreError> {
        *self
            .calls
            .borrow_mut()
            .entry((op, table.to_string()))
            .or_default() += 1;

        let mut failures = self.failures.borrow_mut();
        match failures
            .iter()
            .position(|(o, t, _)| *o == op && t == table)
        {
            Some(index) => Err(failures.remove(index).2),
            None => Ok(()),
        }
    }

    fn stamp(&self, table: &str, mut row: Row) -> Row {
        if let Value::Object(fields) = &mut row {
            if GENERATED_IDS.contains(&table) && !fields.contains_key("id") {
                fields.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
            }
            if !fields.contains_key("created_at") {
                let now = self.clock.get();
                fields.insert("created_at".into(), Value::String(now.to_string()));
                self.clock.set(now + Span::new().minutes(1));
            }
        }
        row
    }

    /// Wait one scheduler turn so callers observe a real suspension point.
    async fn round_trip(&self) {
        tokio::task::yield_now().await;
    }
}

impl DataStore for MockStore {
    async fn select(
        &self,
        table: &str,
        query: &Query,
    ) -> Result<Vec<Row>, StoreError> {
        self.round_trip().await;
        self.record(StoreOp::Select, table)?;
        query.check()?;
        let mut rows: Vec<Row> = self
            .tables
            .borrow()
            .get(table)
            .into_iter()
            .flatten()
            .filter(|row| query.filter.matches(row))
            .cloned()
            .collect();
        rows.sort_by(|a, b| query.compare_rows(a, b));
        let rows = rows
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        self.round_trip().await;
        self.record(StoreOp::Insert, table)?;
        let row = self.stamp(table, row);

        let mut tables = self.tables.borrow_mut();
        let rows = tables.entry(table.to_string()).or_default();
        let keys = unique_keys(table);
        let duplicate = rows.iter().any(|existing| {
            keys.iter().all(|key| {
                existing.get(*key).is_some_and(|value| Some(value) == row.get(*key))
            })
        });
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "duplicate key value violates unique constraint on {table}"
            )));
        }
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        table: &str,
        id: &str,
        patch: Row,
    ) -> Result<Row, StoreError> {
        self.round_trip().await;
        self.record(StoreOp::Update, table)?;
        let mut tables = self.tables.borrow_mut();
        let target = Filter::new().eq("id", id);
        let row = tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|row| target.matches(row)))
            .ok_or_else(|| StoreError::NotFound(format!("{table} {id}")))?;
        if let (Value::Object(fields), Value::Object(changes)) = (&mut *row, patch) {
            fields.extend(changes);
        }
        Ok(row.clone())
    }

    async fn delete(
        &self,
        table: &str,
        filter: &Filter,
    ) -> Result<(), StoreError> {
        self.round_trip().await;
        self.record(StoreOp::Delete, table)?;
        filter.check()?;
        if let Some(rows) = self.tables.borrow_mut().get_mut(table) {
            rows.retain(|row| !filter.matches(row));
        }
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<AuthUser>, StoreError> {
        Ok(self.user.borrow().clone())
    }
}

impl AuthStore for MockStore {
    async fn sign_in(
        &self,
        credentials: &PasswordCredentials,
    ) -> Result<AuthUser, StoreError> {
        self.round_trip().await;
        self.record(StoreOp::Auth, AUTH)?;
        let user = match self.accounts.borrow().get(&credentials.email) {
            Some((password, user)) if *password == credentials.password => {
                user.clone()
            }
            _ => {
                return Err(StoreError::Permission(
                    "Invalid login credentials".into(),
                ));
            }
        };
        self.set_user(Some(user.clone()));
        Ok(user)
    }

    async fn sign_up(
        &self,
        credentials: &PasswordCredentials,
    ) -> Result<Option<AuthUser>, StoreError> {
        self.round_trip().await;
        self.record(StoreOp::Auth, AUTH)?;
        if self.accounts.borrow().contains_key(&credentials.email) {
            return Err(StoreError::Conflict("User already registered".into()));
        }
        let user = self.register(
            &credentials.email,
            &credentials.password,
            UserId::new(),
        );
        self.set_user(Some(user.clone()));
        Ok(Some(user))
    }

    async fn sign_out(&self) -> Result<(), StoreError> {
        self.round_trip().await;
        let recorded = self.record(StoreOp::Auth, AUTH);
        self.set_user(None);
        recorded
    }
}
