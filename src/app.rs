//! Application state and HTTP router.

use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{JwtError, TokenSigner};
use crate::config::{AppConfig, SecurityConfig, StorageMode};
use crate::database::models::{queja, CARGOS_POLICIALES, CATEGORIAS_LICENCIA, QUEJAS, USUARIOS};
use crate::database::{
    Backend, BackendError, CollectionBinding, DatabaseError, DatabaseManager, MemoryBackend, Ownable,
    PgDocumentBackend, PgTableBackend, RecordAccess,
};
use crate::filter::FilterError;
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, require_admin};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("invalid collection binding: {0}")]
    Binding(#[from] FilterError),

    #[error(transparent)]
    Jwt(#[from] JwtError),

    #[error("collection {0} has no ownership field")]
    NotOwnable(&'static str),
}

/// Everything a handler can reach. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub signer: TokenSigner,
    pub usuarios: Ownable<RecordAccess>,
    pub cargos: RecordAccess,
    pub categorias: RecordAccess,
    pub quejas: RecordAccess,
    pub database: Option<DatabaseManager>,
}

impl AppState {
    /// Connects storage according to `config.storage.mode`.
    pub async fn from_config(config: AppConfig) -> Result<Self, StartupError> {
        if config.storage.mode == StorageMode::Memory {
            return Self::in_memory(config);
        }

        let database = DatabaseManager::connect(&config.storage).await?;
        let schema = config.storage.relational_schema.as_str();

        let table = |binding: &CollectionBinding| -> Result<RecordAccess, StartupError> {
            let backend = PgTableBackend::new(database.relational().clone(), schema, binding)?;
            Ok(RecordAccess::new(*binding, Arc::new(backend)))
        };
        let usuarios = table(&USUARIOS)?;
        let cargos = table(&CARGOS_POLICIALES)?;
        let categorias = table(&CATEGORIAS_LICENCIA)?;

        let documents = PgDocumentBackend::new(database.document().clone(), schema, &QUEJAS)?;
        documents.ensure_collection(queja::INDEXED_FIELDS).await?;
        let quejas = RecordAccess::new(QUEJAS, Arc::new(documents));

        Self::assemble(config, usuarios, cargos, categorias, quejas, Some(database))
    }

    /// Every collection in process memory. Nothing survives a restart.
    pub fn in_memory(config: AppConfig) -> Result<Self, StartupError> {
        let memory = |binding: CollectionBinding, backend: MemoryBackend| {
            RecordAccess::new(binding, Arc::new(backend) as Arc<dyn Backend>)
        };
        Self::assemble(
            config,
            memory(USUARIOS, MemoryBackend::table(USUARIOS.id_field)),
            memory(CARGOS_POLICIALES, MemoryBackend::table(CARGOS_POLICIALES.id_field)),
            memory(CATEGORIAS_LICENCIA, MemoryBackend::table(CATEGORIAS_LICENCIA.id_field)),
            memory(QUEJAS, MemoryBackend::documents(QUEJAS.id_field)),
            None,
        )
    }

    fn assemble(
        config: AppConfig,
        usuarios: RecordAccess,
        cargos: RecordAccess,
        categorias: RecordAccess,
        quejas: RecordAccess,
        database: Option<DatabaseManager>,
    ) -> Result<Self, StartupError> {
        let signer = TokenSigner::from_config(&config.security)?;
        let usuarios = Ownable::new(usuarios).ok_or(StartupError::NotOwnable(USUARIOS.name))?;
        Ok(Self {
            config: Arc::new(config),
            signer,
            usuarios,
            cargos,
            categorias,
            quejas,
            database,
        })
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(auth_public_routes())
        .merge(auth_routes(state.clone()))
        .nest("/cargos-policiales", cargos_routes(state.clone()))
        .nest("/categorias-licencia", categorias_routes(state.clone()))
        .nest("/quejas", quejas_routes(state.clone()))
        .route("/ping", get(public::ping));

    let mut app = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api", api)
        .with_state(state.clone());

    if state.config.security.enable_cors {
        app = app.layer(cors_layer(&state.config.security));
    }
    if state.config.api.enable_request_logging {
        app = app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));
    }
    app
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS];
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter(|o| o.as_str() != "*")
        .filter_map(|o| o.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(methods).allow_headers(Any)
    } else {
        CorsLayer::new().allow_origin(origins).allow_methods(methods).allow_headers(Any)
    }
}

fn auth_public_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
}

fn auth_routes(state: AppState) -> Router<AppState> {
    use protected::auth;

    Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/change-password", post(auth::change_password))
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

fn cargos_routes(state: AppState) -> Router<AppState> {
    use protected::cargos_policiales as cargos;

    Router::new()
        .route("/", get(cargos::list).post(cargos::create))
        .route("/:id", get(cargos::show).put(cargos::update).delete(cargos::delete))
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

fn categorias_routes(state: AppState) -> Router<AppState> {
    use protected::categorias_licencia as categorias;

    Router::new()
        .route("/", get(categorias::list).post(categorias::create))
        .route("/:id", get(categorias::show).put(categorias::update).delete(categorias::delete))
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

fn quejas_routes(state: AppState) -> Router<AppState> {
    use protected::quejas;

    let admin = || middleware::from_fn(require_admin);

    Router::new()
        // route_layer only wraps the methods registered before it: listing is
        // admin-only, filing a complaint is open to any signed-in user
        .route("/", get(quejas::list).route_layer(admin()).post(quejas::create))
        .route("/persona/:id_persona", get(quejas::by_persona).route_layer(admin()))
        .route("/comparendo/:id_comparendo", get(quejas::by_comparendo).route_layer(admin()))
        .route(
            "/:id",
            get(quejas::show)
                .put(quejas::update)
                .delete(quejas::delete)
                .route_layer(admin()),
        )
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Transito API",
            "version": version,
            "description": "Users, catalogs and citizen complaints for traffic-violation administration",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "ping": "/api/ping (public)",
                "public_auth": "/api/auth/login, /api/auth/register (public - token acquisition)",
                "auth": "/api/auth/me, /api/auth/change-password (protected)",
                "cargos_policiales": "/api/cargos-policiales[/:id] (protected)",
                "categorias_licencia": "/api/categorias-licencia[/:id] (protected)",
                "quejas": "/api/quejas[/:id|/persona/:id_persona|/comparendo/:id_comparendo] (protected; admin except POST)",
            }
        }
    }))
}

async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    let Some(database) = state.database.as_ref() else {
        return (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "database": "memory" }
            })),
        );
    };

    match database.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "database": "ok" }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": { "status": "degraded", "timestamp": now }
                })),
            )
        }
    }
}
