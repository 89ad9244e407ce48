// handlers/protected/quejas.rs - /api/quejas
//
// Filing a complaint is open to any authenticated user; reading, editing and
// deleting complaints is admin-only (enforced by the router).

use axum::extract::{
    rejection::{JsonRejection, QueryRejection},
    Extension, Path, Query, State,
};
use axum::Json;
use serde_json::Value;

use super::catalog::{self, ListQuery};
use crate::app::AppState;
use crate::database::{FindOptions, PageResult, Record, RecordAccess};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET /api/quejas - Paginated list, oldest first
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<PageResult> {
    let Query(query) = query?;
    catalog::list(&state.quejas, &state.config.api, &query).await
}

/// GET /api/quejas/persona/:id_persona
pub async fn by_persona(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Vec<Record>> {
    find_by_reference(&state.quejas, "id_persona", &id).await
}

/// GET /api/quejas/comparendo/:id_comparendo
pub async fn by_comparendo(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Vec<Record>> {
    find_by_reference(&state.quejas, "id_comparendo", &id).await
}

/// Complaints pointing at one relational row (person or citation).
async fn find_by_reference(quejas: &RecordAccess, field: &'static str, raw: &str) -> ApiResult<Vec<Record>> {
    let id: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("{} must be an integer", field)))?;

    let mut filters = Record::new();
    filters.insert(field.to_string(), Value::from(id));
    let found = quejas.find_all(FindOptions::filtered(filters)).await?;
    Ok(ApiResponse::success(found))
}

/// GET /api/quejas/:id
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Record> {
    catalog::show(&state.quejas, &Value::String(id)).await
}

/// POST /api/quejas - File a complaint
///
/// Expected Input:
/// ```json
/// {
///   "fecha_radicacion": "2024-05-01T10:00:00Z",
///   "texto_queja": "string",
///   "estado": "string",
///   "medio_radicacion": "string",
///   "id_comparendo": 123,
///   "id_persona": 456
/// }
/// ```
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<Record>, JsonRejection>,
) -> ApiResult<Record> {
    let Json(body) = payload?;
    tracing::debug!(filed_by = auth.id_usuario, "Filing complaint");
    catalog::create(&state.quejas, body).await
}

/// PUT /api/quejas/:id - Answer or correct a complaint
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Record>, JsonRejection>,
) -> ApiResult<Record> {
    let Json(body) = payload?;
    catalog::update(&state.quejas, &Value::String(id), body).await
}

/// DELETE /api/quejas/:id - Soft delete
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    catalog::delete(&state.quejas, &Value::String(id)).await
}
