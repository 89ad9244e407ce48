// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition plus liveness endpoints.

pub mod auth;

use crate::middleware::{ApiResponse, ApiResult};
use serde_json::{json, Value};

/// GET /api/ping - Liveness check that never touches storage
pub async fn ping() -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({ "message": "pong" })))
}
