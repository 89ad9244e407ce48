#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

use transito_api::auth::hash_password;
use transito_api::database::models::NewUsuario;
use transito_api::{router, AppConfig, AppState};

static SERVER: OnceLock<TestServer> = OnceLock::new();
static NEXT_USER: AtomicUsize = AtomicUsize::new(1);

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    /// Same state the server uses; lets tests seed records directly.
    pub state: AppState,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let listener = std::net::TcpListener::bind(("127.0.0.1", port)).context("failed to bind test port")?;
        listener.set_nonblocking(true)?;

        let state = AppState::in_memory(AppConfig::in_memory())?;
        let app = router(state.clone());

        // The server outlives any single test runtime, so it gets its own.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .expect("test runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).expect("tokio listener");
                axum::serve(listener, app).await.expect("test server");
            });
        });

        Ok(Self { port, base_url, state })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to start test server"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// A username no other test in this binary uses.
pub fn unique_username(prefix: &str) -> String {
    format!("{}_{}", prefix, NEXT_USER.fetch_add(1, Ordering::Relaxed))
}

/// Registers a citizen through the API and returns its bearer token.
pub async fn register(server: &TestServer, username: &str, password: &str) -> Result<String> {
    let res = reqwest::Client::new()
        .post(server.url("/api/auth/register"))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::CREATED, "register failed: {}", res.status());

    let body: Value = res.json().await?;
    token_from(&body)
}

pub async fn login(server: &TestServer, username: &str, password: &str) -> Result<String> {
    let res = reqwest::Client::new()
        .post(server.url("/api/auth/login"))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "login failed: {}", res.status());

    let body: Value = res.json().await?;
    token_from(&body)
}

fn token_from(body: &Value) -> Result<String> {
    body["data"]["token"]
        .as_str()
        .map(str::to_string)
        .context("response has no token")
}

pub async fn citizen_token(server: &TestServer) -> Result<String> {
    register(server, &unique_username("ciudadano"), "clave-ciudadano").await
}

/// Admins cannot self-register, so the account is seeded straight into storage.
pub async fn admin_token(server: &TestServer) -> Result<String> {
    let username = unique_username("admin");
    let record = NewUsuario {
        username: username.clone(),
        contrasena: hash_password("clave-admin")?.to_string(),
        rol: "admin".to_string(),
        estado: 1,
    }
    .into_record();
    server.state.usuarios.create(record).await?;
    login(server, &username, "clave-admin").await
}
