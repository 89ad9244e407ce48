// handlers/public/auth/mod.rs - Public authentication handlers
//
// Token acquisition endpoints that do not require authentication.

pub mod login; // POST /api/auth/login - authenticate and get JWT
pub mod register; // POST /api/auth/register - create new account

pub use login::login;
pub use register::register;

use serde::Serialize;

use crate::database::models::Usuario;

/// Body returned by login and register.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: Usuario,
}

/// Trims and drops empty strings.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
