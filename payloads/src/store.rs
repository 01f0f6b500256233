//! The remote data store interface.
//!
//! The hosted backend is table oriented: rows are JSON objects, reads take a
//! filter/order/limit/offset query, and writes are independently atomic. No
//! operation spans more than one table, so callers composing several writes
//! must handle partial completion themselves.

use std::cmp::Ordering;
use std::fmt::Display;

use jiff::Timestamp;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{UserId, requests::PasswordCredentials};

/// A single table row as the store returns it.
pub type Row = Value;

/// The identity the store authenticates requests as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Network error. Please check your connection.")]
    Network(String),
    #[error("Permission denied: {0}")]
    Permission(String),
    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Could not read store response: {0}")]
    Decode(String),
    #[error("Could not encode row: {0}")]
    Encode(String),
    /// An unhandled error status with the response text.
    #[error("{message}")]
    Api { status: u16, message: String },
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Value must be a JSON array; matches if any element is equal.
    In,
    IsNull,
}

impl Op {
    fn as_str(self) -> &'static str {
        match self {
            Op::Eq => "eq",
            Op::Neq => "neq",
            Op::Gt => "gt",
            Op::Gte => "gte",
            Op::Lt => "lt",
            Op::Lte => "lte",
            Op::In => "in",
            Op::IsNull => "is",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub op: Op,
    pub value: Value,
}

impl Condition {
    /// Evaluate the condition against a row the way the store would.
    pub fn matches(&self, row: &Row) -> bool {
        let field = row.get(&self.column).unwrap_or(&Value::Null);
        match self.op {
            Op::IsNull => field.is_null(),
            Op::In => self
                .value
                .as_array()
                .is_some_and(|values| values.iter().any(|v| values_equal(field, v))),
            Op::Eq => values_equal(field, &self.value),
            Op::Neq => !values_equal(field, &self.value),
            Op::Gt => compare_values(field, &self.value) == Some(Ordering::Greater),
            Op::Gte => matches!(
                compare_values(field, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Op::Lt => compare_values(field, &self.value) == Some(Ordering::Less),
            Op::Lte => matches!(
                compare_values(field, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
        }
    }

    /// Render as a PostgREST query parameter value, e.g. `eq.42`.
    fn param_value(&self) -> String {
        match self.op {
            Op::IsNull => "is.null".to_string(),
            Op::In => {
                let items = self
                    .value
                    .as_array()
                    .map(|values| {
                        values
                            .iter()
                            .map(|v| match v {
                                Value::String(s) => format!("\"{s}\""),
                                other => render_value(other),
                            })
                            .collect::<Vec<_>>()
                            .join(",")
                    })
                    .unwrap_or_default();
                format!("in.({items})")
            }
            op => format!("{}.{}", op.as_str(), render_value(&self.value)),
        }
    }
}

/// A conjunction of conditions. An empty filter matches every row.
///
/// A value that fails to encode drops its condition and poisons the filter:
/// it then matches no rows and [`Filter::check`] returns the encoding error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub conditions: Vec<Condition>,
    invalid: Option<StoreError>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        column: impl Into<String>,
        op: Op,
        value: impl Serialize,
    ) -> Self {
        let column = column.into();
        match serde_json::to_value(value) {
            Ok(value) => self.conditions.push(Condition { column, op, value }),
            Err(e) => {
                self.invalid.get_or_insert(StoreError::Encode(format!(
                    "filter value for {column}: {e}"
                )));
            }
        }
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl Serialize) -> Self {
        self.with(column, Op::Eq, value)
    }

    pub fn neq(self, column: impl Into<String>, value: impl Serialize) -> Self {
        self.with(column, Op::Neq, value)
    }

    pub fn in_list<V: Serialize>(
        self,
        column: impl Into<String>,
        values: &[V],
    ) -> Self {
        self.with(column, Op::In, values)
    }

    pub fn is_null(self, column: impl Into<String>) -> Self {
        self.with(column, Op::IsNull, Value::Null)
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.invalid.is_none() && self.conditions.iter().all(|c| c.matches(row))
    }

    /// Fails if any condition value could not be encoded.
    pub fn check(&self) -> Result<(), StoreError> {
        match &self.invalid {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Filter,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl From<Filter> for Query {
    fn from(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Serialize) -> Self {
        self.filter = self.filter.eq(column, value);
        self
    }

    pub fn in_list<V: Serialize>(
        mut self,
        column: impl Into<String>,
        values: &[V],
    ) -> Self {
        self.filter = self.filter.in_list(column, values);
        self
    }

    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order.push(Order {
            column: column.into(),
            ascending: false,
        });
        self
    }

    pub fn order_asc(mut self, column: impl Into<String>) -> Self {
        self.order.push(Order {
            column: column.into(),
            ascending: true,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn check(&self) -> Result<(), StoreError> {
        self.filter.check()
    }

    /// Compare two rows by this query's ordering.
    pub fn compare_rows(&self, a: &Row, b: &Row) -> Ordering {
        for order in &self.order {
            let left = a.get(&order.column).unwrap_or(&Value::Null);
            let right = b.get(&order.column).unwrap_or(&Value::Null);
            let ordering =
                compare_values(left, right).unwrap_or(Ordering::Equal);
            let ordering = if order.ascending {
                ordering
            } else {
                ordering.reverse()
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Query string parameters in the store's REST dialect.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .filter
            .conditions
            .iter()
            .map(|c| (c.column.clone(), c.param_value()))
            .collect();
        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|o| {
                    let direction = if o.ascending { "asc" } else { "desc" };
                    format!("{}.{direction}", o.column)
                })
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".into(), order));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".into(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            params.push(("offset".into(), offset.to_string()));
        }
        params
    }
}

impl Filter {
    /// Query string parameters for a bare filter, as used by deletes.
    pub fn to_params(&self) -> Vec<(String, String)> {
        self.conditions
            .iter()
            .map(|c| (c.column.clone(), c.param_value()))
            .collect()
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    a == b || compare_values(a, b) == Some(Ordering::Equal)
}

/// Order two JSON scalars. Strings that both parse as timestamps compare as
/// instants so that fractional seconds sort correctly.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => {
            match (x.parse::<Timestamp>(), y.parse::<Timestamp>()) {
                (Ok(x), Ok(y)) => Some(x.cmp(&y)),
                _ => Some(x.cmp(y)),
            }
        }
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// The hosted store's table operations.
///
/// Implementations are used from a single-threaded event loop, so the
/// returned futures are not required to be `Send`.
#[allow(async_fn_in_trait)]
pub trait DataStore {
    async fn select(
        &self,
        table: &str,
        query: &Query,
    ) -> Result<Vec<Row>, StoreError>;

    /// Insert a row and return it as stored, with server-assigned fields.
    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError>;

    /// Merge `patch` into the row with the given id.
    async fn update(
        &self,
        table: &str,
        id: &str,
        patch: Row,
    ) -> Result<Row, StoreError>;

    async fn delete(&self, table: &str, filter: &Filter)
    -> Result<(), StoreError>;

    async fn current_user(&self) -> Result<Option<AuthUser>, StoreError>;
}

/// Password auth against the store's identity service. After a successful
/// sign in, table requests run as the returned user until sign out.
#[allow(async_fn_in_trait)]
pub trait AuthStore: DataStore {
    async fn sign_in(
        &self,
        credentials: &PasswordCredentials,
    ) -> Result<AuthUser, StoreError>;

    /// Register an account. `None` means the project holds the session back
    /// until the email address is confirmed.
    async fn sign_up(
        &self,
        credentials: &PasswordCredentials,
    ) -> Result<Option<AuthUser>, StoreError>;

    /// Forget the signed-in identity. Later requests run anonymously even
    /// if revoking the session remotely failed.
    async fn sign_out(&self) -> Result<(), StoreError>;
}

/// A row type bound to the table it lives in.
pub trait Table: Serialize + DeserializeOwned {
    const NAME: &'static str;
}

/// Typed helpers over [`DataStore`].
#[allow(async_fn_in_trait)]
pub trait TableExt: DataStore {
    async fn fetch<T: Table>(&self, query: &Query) -> Result<Vec<T>, StoreError> {
        self.select(T::NAME, query)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    async fn fetch_one<T: Table>(
        &self,
        filter: Filter,
    ) -> Result<Option<T>, StoreError> {
        let query = Query::from(filter).limit(1);
        Ok(self.fetch(&query).await?.into_iter().next())
    }

    async fn create<T: Table>(
        &self,
        new: &impl Serialize,
    ) -> Result<T, StoreError> {
        let row = self.insert(T::NAME, encode(new)?).await?;
        decode(row)
    }

    async fn modify<T: Table>(
        &self,
        id: impl Display,
        patch: &impl Serialize,
    ) -> Result<T, StoreError> {
        let row = self
            .update(T::NAME, &id.to_string(), encode(patch)?)
            .await?;
        decode(row)
    }

    async fn remove<T: Table>(&self, filter: &Filter) -> Result<(), StoreError> {
        self.delete(T::NAME, filter).await
    }
}

impl<S: DataStore> TableExt for S {}

pub fn encode(value: &impl Serialize) -> Result<Row, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Encode(e.to_string()))
}

pub fn decode<T: DeserializeOwned>(row: Row) -> Result<T, StoreError> {
    serde_json::from_value(row).map_err(|e| StoreError::Decode(e.to_string()))
}
