// handlers/protected/cargos_policiales.rs - /api/cargos-policiales

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

/// GET /api/cargos-policiales - Paginated list
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<PageResult> {
    let Query(query) = query?;
    catalog::list(&state.cargos, &state.config.api, &query).await
}

/// GET /api/cargos-policiales/:id
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Record> {
    catalog::show(&state.cargos, &id_from_path(&id)).await
}

/// POST /api/cargos-policiales
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<Record>, JsonRejection>,
) -> ApiResult<Record> {
    let Json(body) = payload?;
    catalog::create(&state.cargos, body).await
}

/// PUT /api/cargos-policiales/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Record>, JsonRejection>,
) -> ApiResult<Record> {
    let Json(body) = payload?;
    catalog::update(&state.cargos, &id_from_path(&id), body).await
}

/// DELETE /api/cargos-policiales/:id - Soft delete
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    catalog::delete(&state.cargos, &id_from_path(&id)).await
}
