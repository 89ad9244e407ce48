// handlers/public/auth/register.rs - POST /api/auth/register handler

use axum::extract::{rejection::JsonRejection, State};
use axum::Json;
use serde::Deserialize;

use super::{non_empty, SessionResponse};
use crate::app::AppState;
use crate::auth::hash_password;
use crate::database::models::usuario::{self, NewUsuario, Usuario};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

/// Self-registered accounts always get this role; admins are provisioned out of band.
pub const DEFAULT_ROLE: &str = "ciudadano";

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// POST /api/auth/register - Create an account and sign it in
///
/// Expected Input:
/// ```json
/// { "username": "string", "password": "string" }
/// ```
///
/// Any `rol` in the body is ignored.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<SessionResponse> {
    let Json(body) = payload?;
    let (Some(username), Some(password)) = (non_empty(body.username), body.password.filter(|p| !p.is_empty())) else {
        return Err(ApiError::bad_request("username and password are required"));
    };

    if usuario::find_by_username(&state.usuarios, &username).await?.is_some() {
        return Err(ApiError::conflict("User already exists"));
    }

    let record = NewUsuario {
        username,
        contrasena: hash_password(&password)?.to_string(),
        rol: DEFAULT_ROLE.to_string(),
        estado: 1,
    }
    .into_record();
    usuario::validate_payload(&record)?;

    let user = Usuario::from_record(state.usuarios.create(record).await?)?;
    let token = state.signer.sign(&state.signer.claims_for(&user)?)?;
    tracing::info!(username = %user.username, id_usuario = user.id_usuario, rol = %user.rol, "User registered");

    Ok(ApiResponse::created(SessionResponse { token, user }))
}
