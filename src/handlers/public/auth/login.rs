// handlers/public/auth/login.rs - POST /api/auth/login handler

use axum::extract::{rejection::JsonRejection, State};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use super::{non_empty, SessionResponse};
use crate::app::AppState;
use crate::auth::{hash_password, PasswordHash};
use crate::database::models::usuario::{self, Usuario};
use crate::database::Record;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

const BAD_CREDENTIALS: &str = "Invalid username or password";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// POST /api/auth/login - Authenticate user and receive JWT token
///
/// Expected Input:
/// ```json
/// { "username": "string", "password": "string" }
/// ```
///
/// Unknown users and wrong passwords get the same 401. A legacy SHA-256
/// hash that verifies is replaced by a bcrypt hash before responding.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<SessionResponse> {
    let Json(body) = payload?;
    let (Some(username), Some(password)) = (non_empty(body.username), body.password.filter(|p| !p.is_empty())) else {
        return Err(ApiError::bad_request("username and password are required"));
    };

    let Some(user) = usuario::find_by_username(&state.usuarios, &username).await? else {
        tracing::info!(%username, "Login failed: unknown user");
        return Err(ApiError::unauthorized(BAD_CREDENTIALS));
    };

    if !user.is_active() {
        tracing::info!(%username, estado = ?user.estado, "Login refused: inactive user");
        return Err(ApiError::unauthorized("User is inactive. Contact an administrator."));
    }

    let Some(stored) = user.contrasena.as_deref().filter(|s| !s.is_empty()) else {
        tracing::error!(%username, "User has no stored password hash");
        return Err(ApiError::internal_server_error("User credentials are misconfigured"));
    };

    let hash = PasswordHash::parse(stored);
    if !hash.as_ref().is_some_and(|h| h.verify(&password)) {
        tracing::info!(%username, hash = %hash.as_ref().map(|h| h.hint()).unwrap_or_else(|| "unrecognized".into()), "Login failed: bad password");
        return Err(ApiError::unauthorized(BAD_CREDENTIALS));
    }

    if hash.as_ref().is_some_and(PasswordHash::needs_rehash) {
        upgrade_hash(&state, &user, &password).await;
    }

    let token = state.signer.sign(&state.signer.claims_for(&user)?)?;
    tracing::info!(%username, id_usuario = user.id_usuario, "Login succeeded");

    Ok(ApiResponse::success(SessionResponse { token, user }))
}

/// Rehashes a verified legacy credential as bcrypt. Failures are logged, not
/// surfaced: the user already proved the password.
async fn upgrade_hash(state: &AppState, user: &Usuario, password: &str) {
    let upgraded = match hash_password(password) {
        Ok(h) => h,
        Err(e) => {
            tracing::warn!(id_usuario = user.id_usuario, "Could not rehash legacy password: {}", e);
            return;
        }
    };

    let mut changes = Record::new();
    changes.insert("username".into(), Value::String(user.username.clone()));
    changes.insert("rol".into(), Value::String(user.rol.clone()));
    changes.insert("contrasena".into(), Value::String(upgraded.to_string()));

    match state.usuarios.update(&user.id(), changes).await {
        Ok(Some(_)) => tracing::info!(id_usuario = user.id_usuario, "Upgraded legacy password hash to bcrypt"),
        Ok(None) => tracing::warn!(id_usuario = user.id_usuario, "User vanished during hash upgrade"),
        Err(e) => tracing::warn!(id_usuario = user.id_usuario, "Hash upgrade failed: {}", e),
    }
}
