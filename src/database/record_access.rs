//! Record access layer.
//!
//! [`RecordAccess`] wraps one [`Backend`] with the policy every collection
//! shares: required-field validation, soft deletes and pagination. Handlers
//! never talk to a backend directly.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::backend::{Backend, BackendError, Filters, QueryOptions, Record};
use super::binding::{CollectionBinding, DELETED_AT};
use super::validation::{check_kinds, is_missing, require_fields, ValidationError};
use crate::types::Operation;

#[derive(Debug, Error)]
pub enum AccessError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type AccessResult<T> = Result<T, AccessError>;

#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub with_deleted: bool,
    pub filters: Filters,
}

impl FindOptions {
    pub fn filtered(filters: Filters) -> Self {
        Self { with_deleted: false, filters }
    }
}

#[derive(Debug, Clone)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
    pub filters: Filters,
    pub with_deleted: bool,
}

impl PageRequest {
    pub fn new(page: u64, page_size: u64) -> Self {
        Self { page, page_size, filters: Filters::new(), with_deleted: false }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    pub data: Vec<Record>,
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Clone)]
pub struct RecordAccess {
    binding: CollectionBinding,
    backend: Arc<dyn Backend>,
}

impl RecordAccess {
    pub fn new(binding: CollectionBinding, backend: Arc<dyn Backend>) -> Self {
        Self { binding, backend }
    }

    pub fn binding(&self) -> &CollectionBinding {
        &self.binding
    }

    /// Caller filters plus the soft-delete predicate, when it applies.
    fn scoped(&self, filters: &Filters, with_deleted: bool) -> Filters {
        let mut scoped = filters.clone();
        if self.binding.soft_delete && !with_deleted {
            scoped.insert(DELETED_AT.to_string(), Value::Null);
        }
        scoped
    }

    fn is_soft_deleted(&self, record: &Record) -> bool {
        self.binding.soft_delete && !is_missing(record.get(DELETED_AT))
    }

    /// Type-checks the payload and drops keys the collection does not declare.
    fn sanitize(&self, mut payload: Record) -> Result<Record, ValidationError> {
        check_kinds(&payload, self.binding.fields)?;
        let before = payload.len();
        payload.retain(|key, _| self.binding.is_writable(key));
        if payload.len() != before {
            tracing::debug!(collection = self.binding.name, dropped = before - payload.len(), "Dropped undeclared fields");
        }
        Ok(payload)
    }

    pub async fn find_all(&self, opts: FindOptions) -> AccessResult<Vec<Record>> {
        let filters = self.scoped(&opts.filters, opts.with_deleted);
        let query = QueryOptions::default().sorted(self.binding.default_sort);
        Ok(self.backend.query(&filters, query).await?)
    }

    /// A soft-deleted record is reported exactly like a missing one.
    pub async fn find_by_id(&self, id: &Value, with_deleted: bool) -> AccessResult<Option<Record>> {
        let record = self.backend.get_by_id(id).await?;
        Ok(record.filter(|r| with_deleted || !self.is_soft_deleted(r)))
    }

    pub async fn create(&self, payload: Record) -> AccessResult<Record> {
        require_fields(&payload, &self.binding.required(Operation::Create))?;
        let mut payload = self.sanitize(payload)?;
        if self.binding.soft_delete {
            payload.entry(DELETED_AT).or_insert(Value::Null);
        }

        let record = self.backend.insert(payload).await?;
        tracing::debug!(collection = self.binding.name, backend = self.backend.kind(), "Record created");
        Ok(record)
    }

    /// `deleted_at` in the payload is ignored. Soft-deleted records are not updated.
    pub async fn update(&self, id: &Value, payload: Record) -> AccessResult<Option<Record>> {
        require_fields(&payload, &self.binding.required(Operation::Update))?;
        let mut payload = self.sanitize(payload)?;
        payload.remove(DELETED_AT);

        if self.binding.soft_delete && self.find_by_id(id, false).await?.is_none() {
            return Ok(None);
        }
        Ok(self.backend.update_by_id(id, payload).await?)
    }

    /// Soft delete sets `deleted_at` once; deleting again changes nothing.
    /// Returns `false` when no record has `id`.
    pub async fn delete(&self, id: &Value, extra: Option<Record>) -> AccessResult<bool> {
        if !self.binding.soft_delete {
            return Ok(self.backend.delete_by_id(id).await?);
        }

        let mut payload = extra.unwrap_or_default();
        payload.remove(DELETED_AT);
        require_fields(&payload, &self.binding.required(Operation::Delete))?;
        let mut payload = self.sanitize(payload)?;
        payload.insert(DELETED_AT.to_string(), Value::String(Utc::now().to_rfc3339()));

        let Some(existing) = self.backend.get_by_id(id).await? else {
            return Ok(false);
        };
        if self.is_soft_deleted(&existing) {
            tracing::debug!(collection = self.binding.name, "Record already deleted");
            return Ok(true);
        }

        let deleted = self.backend.update_by_id(id, payload).await?.is_some();
        if deleted {
            tracing::info!(collection = self.binding.name, id = %id, "Record soft-deleted");
        }
        Ok(deleted)
    }

    /// One page plus the total; both queries share the same predicate and run concurrently.
    pub async fn find_page(&self, req: PageRequest) -> AccessResult<PageResult> {
        if req.page < 1 {
            return Err(ValidationError::for_field("page", "page must be at least 1").into());
        }
        if req.page_size < 1 {
            return Err(ValidationError::for_field("pageSize", "pageSize must be at least 1").into());
        }

        let filters = self.scoped(&req.filters, req.with_deleted);
        let skip = (req.page - 1).saturating_mul(req.page_size);
        let query = QueryOptions::page(skip, req.page_size).sorted(self.binding.default_sort);

        let (data, total) = futures::try_join!(
            self.backend.query(&filters, query),
            self.backend.count(&filters)
        )?;

        Ok(PageResult {
            data,
            page: req.page,
            page_size: req.page_size,
            total,
            total_pages: total.div_ceil(req.page_size),
        })
    }
}
