use axum::extract::{rejection::JsonRejection, Extension, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::{hash_password, verify_password};
use crate::database::models::Usuario;
use crate::database::Record;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// POST /api/auth/change-password - Replace the caller's password
///
/// Expected Input:
/// ```json
/// { "currentPassword": "string", "newPassword": "string" }
/// ```
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(body) = payload?;
    let (Some(current), Some(new)) = (
        body.current_password.filter(|p| !p.is_empty()),
        body.new_password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("currentPassword and newPassword are required"));
    };

    let Some(record) = state.usuarios.find_by_id(&auth.actor_id(), false).await? else {
        return Err(ApiError::not_found("User not found"));
    };
    let user = Usuario::from_record(record)?;

    if !user.contrasena.as_deref().is_some_and(|stored| verify_password(&current, stored)) {
        tracing::info!(id_usuario = user.id_usuario, "Password change refused: wrong current password");
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    // username and rol are required on every user update
    let mut changes = Record::new();
    changes.insert("username".into(), Value::String(user.username.clone()));
    changes.insert("rol".into(), Value::String(user.rol.clone()));
    changes.insert("contrasena".into(), Value::String(hash_password(&new)?.to_string()));

    if state.usuarios.update(&user.id(), changes).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }
    tracing::info!(id_usuario = user.id_usuario, "Password changed");

    Ok(ApiResponse::success(json!({ "message": "Password updated" })))
}
