use axum::extract::{Extension, State};

use crate::app::AppState;
use crate::database::models::Usuario;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET /api/auth/me - The caller's own user record, without the password hash
pub async fn me(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<Usuario> {
    let actor = auth.actor_id();
    let record = state.usuarios.find_by_id_owned(&actor, &actor).await?;
    Ok(ApiResponse::success(Usuario::from_record(record)?))
}
