//! Storage backend contract used by the record access layer.
//!
//! A backend knows how to run equality-filtered queries against one
//! collection (a relational table or a document collection). It knows
//! nothing about soft deletes, required fields or ownership: those are
//! applied by [`RecordAccess`](crate::database::RecordAccess) before a call
//! reaches the backend.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::SortOrder;

/// A stored row or document, keyed by field name.
pub type Record = Map<String, Value>;

/// Equality predicates. A `null` value matches null or absent fields.
pub type Filters = Map<String, Value>;

const MAX_ROWS: u64 = i64::MAX as u64;

/// Paging and ordering for [`Backend::query`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOptions {
    pub skip: u64,
    pub limit: Option<u64>,
    pub sort: Option<SortOrder>,
}

impl QueryOptions {
    /// Both values are capped at `i64::MAX`, the largest `LIMIT`/`OFFSET` Postgres accepts.
    pub fn page(skip: u64, limit: u64) -> Self {
        Self {
            skip: skip.min(MAX_ROWS),
            limit: Some(limit.min(MAX_ROWS)),
            sort: None,
        }
    }

    pub fn sorted(mut self, sort: Option<SortOrder>) -> Self {
        self.sort = sort;
        self
    }
}

/// Storage failures, normalized across backends.
///
/// The underlying cause is kept for logs; it is never sent to clients.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("query error: {0}")]
    Query(String),

    #[error("failed to decode stored record: {0}")]
    Decode(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl From<crate::filter::FilterError> for BackendError {
    fn from(err: crate::filter::FilterError) -> Self {
        BackendError::Query(err.to_string())
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

#[async_trait]
pub trait Backend: Send + Sync {
    /// Records matching every filter, in `opts.sort` order (or backend order).
    async fn query(&self, filters: &Filters, opts: QueryOptions) -> BackendResult<Vec<Record>>;

    async fn count(&self, filters: &Filters) -> BackendResult<u64>;

    async fn get_by_id(&self, id: &Value) -> BackendResult<Option<Record>>;

    /// Persists `payload` and returns the stored record with its assigned id.
    async fn insert(&self, payload: Record) -> BackendResult<Record>;

    /// Merges `payload` into the record. `None` when no record has `id`.
    async fn update_by_id(&self, id: &Value, payload: Record) -> BackendResult<Option<Record>>;

    /// Removes the record permanently. `false` when nothing matched.
    async fn delete_by_id(&self, id: &Value) -> BackendResult<bool>;

    /// Backend name for logs.
    fn kind(&self) -> &'static str;
}

/// Turns a path segment into an id value: integers stay numeric so they
/// compare equal to serial ids, anything else is kept as text.
pub fn id_from_path(raw: &str) -> Value {
    match raw.trim().parse::<i64>() {
        Ok(n) => Value::from(n),
        Err(_) => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_ids_keep_numbers_numeric() {
        assert_eq!(id_from_path("42"), Value::from(42));
        assert_eq!(
            id_from_path("6650f0c2e4b0a1a2b3c4d5e6"),
            Value::String("6650f0c2e4b0a1a2b3c4d5e6".to_string())
        );
    }

    #[test]
    fn page_options_fit_postgres_bigint() {
        let opts = QueryOptions::page(u64::MAX, u64::MAX);
        assert_eq!(opts.skip, i64::MAX as u64);
        assert_eq!(opts.limit, Some(i64::MAX as u64));

        let opts = QueryOptions::page(40, 20);
        assert_eq!((opts.skip, opts.limit), (40, Some(20)));
    }
}
