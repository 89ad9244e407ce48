//! CRUD shared by every collection exposed as a plain resource.
//!
//! The per-collection modules only pick the [`RecordAccess`] and turn path
//! segments into ids.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::ApiConfig;
use crate::database::{Filters, PageRequest, PageResult, Record, RecordAccess};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

/// `?page=&pageSize=&limit=&withDeleted=`
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u64>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<u64>,
    /// Alias of `pageSize`
    pub limit: Option<u64>,
    #[serde(rename = "withDeleted")]
    pub with_deleted: Option<bool>,
}

impl ListQuery {
    /// Page size falls back to the configured default and is capped at the maximum.
    pub fn page_request(&self, api: &ApiConfig) -> PageRequest {
        let page_size = self
            .page_size
            .or(self.limit)
            .unwrap_or(api.default_page_size)
            .min(api.max_page_size);
        PageRequest {
            page: self.page.unwrap_or(1),
            page_size,
            filters: Filters::new(),
            with_deleted: self.with_deleted.unwrap_or(false),
        }
    }
}

fn not_found(ral: &RecordAccess, id: &Value) -> ApiError {
    ApiError::not_found(format!("Record {} not found in {}", id, ral.binding().name))
}

pub async fn list(ral: &RecordAccess, api: &ApiConfig, query: &ListQuery) -> ApiResult<PageResult> {
    let page = ral.find_page(query.page_request(api)).await?;
    Ok(ApiResponse::success(page))
}

pub async fn show(ral: &RecordAccess, id: &Value) -> ApiResult<Record> {
    let record = ral.find_by_id(id, false).await?.ok_or_else(|| not_found(ral, id))?;
    Ok(ApiResponse::success(record))
}

pub async fn create(ral: &RecordAccess, body: Record) -> ApiResult<Record> {
    if body.is_empty() {
        return Err(ApiError::bad_request("Request body has no fields"));
    }
    let record = ral.create(body).await?;
    let id = record.get(ral.binding().id_field).cloned().unwrap_or_default();
    tracing::info!(collection = ral.binding().name, %id, "Record created");
    Ok(ApiResponse::created(record))
}

pub async fn update(ral: &RecordAccess, id: &Value, body: Record) -> ApiResult<Record> {
    if body.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }
    let record = ral.update(id, body).await?.ok_or_else(|| not_found(ral, id))?;
    Ok(ApiResponse::success(record))
}

/// Answers with the record as it stands after the delete.
pub async fn delete(ral: &RecordAccess, id: &Value) -> ApiResult<Value> {
    if !ral.delete(id, None).await? {
        return Err(not_found(ral, id));
    }
    let data = match ral.find_by_id(id, true).await? {
        Some(record) => Value::Object(record),
        None => json!({ ral.binding().id_field: id, "deleted": true }),
    };
    Ok(ApiResponse::success(data))
}
