//! In-memory backend.
//!
//! Keeps records in insertion order behind a [`tokio::sync::RwLock`].
//! Used by the test suite and by `STORAGE_MODE=memory`; nothing is persisted.

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::backend::{Backend, BackendResult, Filters, QueryOptions, Record};
use crate::types::SortDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    /// Serial integer ids, like a relational table
    Table,
    /// UUID string ids plus `createdAt` / `updatedAt`, like a document collection
    Documents,
}

#[derive(Default)]
struct Store {
    last_id: i64,
    rows: Vec<Record>,
}

/// Cheap to clone; clones share the same data.
#[derive(Clone)]
pub struct MemoryBackend {
    store: Arc<RwLock<Store>>,
    id_field: &'static str,
    flavor: Flavor,
}

impl MemoryBackend {
    pub fn table(id_field: &'static str) -> Self {
        Self::with_flavor(id_field, Flavor::Table)
    }

    pub fn documents(id_field: &'static str) -> Self {
        Self::with_flavor(id_field, Flavor::Documents)
    }

    fn with_flavor(id_field: &'static str, flavor: Flavor) -> Self {
        Self {
            store: Arc::new(RwLock::new(Store::default())),
            id_field,
            flavor,
        }
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.rows.len()
    }

    fn has_id(&self, record: &Record, id: &Value) -> bool {
        record.get(self.id_field) == Some(id)
    }
}

fn matches(record: &Record, filters: &Filters) -> bool {
    filters.iter().all(|(field, expected)| {
        let actual = record.get(field);
        match expected {
            Value::Null => matches!(actual, None | Some(Value::Null)),
            Value::Array(options) => actual.is_some_and(|a| options.contains(a)),
            _ => actual == Some(expected),
        }
    })
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        // nulls first
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn query(&self, filters: &Filters, opts: QueryOptions) -> BackendResult<Vec<Record>> {
        let store = self.store.read().await;
        let mut rows: Vec<Record> = store.rows.iter().filter(|r| matches(r, filters)).cloned().collect();

        if let Some(sort) = opts.sort {
            rows.sort_by(|a, b| {
                let ord = compare_values(a.get(sort.field), b.get(sort.field));
                match sort.direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            });
        }

        let skip = usize::try_from(opts.skip).unwrap_or(usize::MAX);
        let limit = opts
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(skip).take(limit).collect())
    }

    async fn count(&self, filters: &Filters) -> BackendResult<u64> {
        let store = self.store.read().await;
        Ok(store.rows.iter().filter(|r| matches(r, filters)).count() as u64)
    }

    async fn get_by_id(&self, id: &Value) -> BackendResult<Option<Record>> {
        let store = self.store.read().await;
        Ok(store.rows.iter().find(|r| self.has_id(r, id)).cloned())
    }

    async fn insert(&self, mut payload: Record) -> BackendResult<Record> {
        let mut store = self.store.write().await;
        let id = match self.flavor {
            Flavor::Table => {
                store.last_id += 1;
                Value::from(store.last_id)
            }
            Flavor::Documents => Value::String(Uuid::new_v4().to_string()),
        };
        payload.insert(self.id_field.to_string(), id);

        if self.flavor == Flavor::Documents {
            let now = Value::String(Utc::now().to_rfc3339());
            payload.insert("createdAt".to_string(), now.clone());
            payload.insert("updatedAt".to_string(), now);
        }

        store.rows.push(payload.clone());
        Ok(payload)
    }

    async fn update_by_id(&self, id: &Value, payload: Record) -> BackendResult<Option<Record>> {
        let mut store = self.store.write().await;
        let Some(row) = store.rows.iter_mut().find(|r| self.has_id(r, id)) else {
            return Ok(None);
        };

        for (key, value) in payload {
            if key != self.id_field {
                row.insert(key, value);
            }
        }
        if self.flavor == Flavor::Documents {
            row.insert("updatedAt".to_string(), Value::String(Utc::now().to_rfc3339()));
        }
        Ok(Some(row.clone()))
    }

    async fn delete_by_id(&self, id: &Value) -> BackendResult<bool> {
        let mut store = self.store.write().await;
        let before = store.rows.len();
        store.rows.retain(|r| !self.has_id(r, id));
        Ok(store.rows.len() != before)
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SortOrder;
    use serde_json::json;

    fn record(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn table_ids_are_sequential() {
        let backend = MemoryBackend::table("id");
        let a = backend.insert(record(json!({ "nombre": "a" }))).await.unwrap();
        let b = backend.insert(record(json!({ "nombre": "b" }))).await.unwrap();
        assert_eq!(a["id"], json!(1));
        assert_eq!(b["id"], json!(2));
        assert_eq!(backend.get_by_id(&json!(2)).await.unwrap().unwrap()["nombre"], json!("b"));
    }

    #[tokio::test]
    async fn documents_get_string_ids_and_timestamps() {
        let backend = MemoryBackend::documents("_id");
        let doc = backend.insert(record(json!({ "estado": "radicada" }))).await.unwrap();
        assert!(doc["_id"].is_string());
        assert!(doc.contains_key("createdAt"));
        assert!(doc.contains_key("updatedAt"));
    }

    #[tokio::test]
    async fn null_filter_matches_missing_and_null() {
        let backend = MemoryBackend::table("id");
        backend.insert(record(json!({ "deleted_at": null }))).await.unwrap();
        backend.insert(record(json!({}))).await.unwrap();
        backend.insert(record(json!({ "deleted_at": "2024-01-01T00:00:00Z" }))).await.unwrap();

        let filters = record(json!({ "deleted_at": null }));
        assert_eq!(backend.count(&filters).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn query_sorts_skips_and_limits() {
        let backend = MemoryBackend::table("id");
        for n in ["c", "a", "b", "d"] {
            backend.insert(record(json!({ "nombre": n }))).await.unwrap();
        }

        let opts = QueryOptions::page(1, 2).sorted(Some(SortOrder::asc("nombre")));
        let rows = backend.query(&Filters::new(), opts).await.unwrap();
        let names: Vec<_> = rows.iter().map(|r| r["nombre"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["b", "c"]);

        let opts = QueryOptions::default().sorted(Some(SortOrder::desc("id")));
        let rows = backend.query(&Filters::new(), opts).await.unwrap();
        assert_eq!(rows[0]["id"], json!(4));
    }

    #[tokio::test]
    async fn update_merges_and_delete_removes() {
        let backend = MemoryBackend::table("id");
        backend.insert(record(json!({ "nombre": "a", "codigo": "A1" }))).await.unwrap();

        let updated = backend
            .update_by_id(&json!(1), record(json!({ "nombre": "b", "id": 99 })))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["nombre"], json!("b"));
        assert_eq!(updated["codigo"], json!("A1"));
        assert_eq!(updated["id"], json!(1));

        assert!(backend.update_by_id(&json!(7), Record::new()).await.unwrap().is_none());
        assert!(backend.delete_by_id(&json!(1)).await.unwrap());
        assert!(!backend.delete_by_id(&json!(1)).await.unwrap());
        assert_eq!(backend.len().await, 0);
    }
}
