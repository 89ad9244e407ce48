// handlers/protected/categorias_licencia.rs - /api/categorias-licencia

use axum::extract::{
    rejection::{JsonRejection, QueryRejection},
    Path, Query, State,
};
use axum::Json;
use serde_json::Value;

use super::catalog::{self, ListQuery};
use crate::app::AppState;
use crate::database::{id_from_path, PageResult, Record};
use crate::middleware::ApiResult;

/// GET /api/categorias-licencia - Paginated list
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<PageResult> {
    let Query(query) = query?;
    catalog::list(&state.categorias, &state.config.api, &query).await
}

/// GET /api/categorias-licencia/:id
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Record> {
    catalog::show(&state.categorias, &id_from_path(&id)).await
}

/// POST /api/categorias-licencia
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<Record>, JsonRejection>,
) -> ApiResult<Record> {
    let Json(body) = payload?;
    catalog::create(&state.categorias, body).await
}

/// PUT /api/categorias-licencia/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Record>, JsonRejection>,
) -> ApiResult<Record> {
    let Json(body) = payload?;
    catalog::update(&state.categorias, &id_from_path(&id), body).await
}

/// DELETE /api/categorias-licencia/:id - Soft delete
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    catalog::delete(&state.categorias, &id_from_path(&id)).await
}
