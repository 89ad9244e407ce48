// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Route groups are wrapped in `jwt_auth_middleware`; admin-only routes add
// `require_admin` on top. Handlers read the caller from `Extension<AuthUser>`.

pub mod auth; // Own account: profile and password
pub mod cargos_policiales;
pub mod catalog; // Shared CRUD for relational catalogs
pub mod categorias_licencia;
pub mod quejas; // Complaints (document store)
