mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use transito_api::auth::PasswordHash;
use transito_api::database::models::usuario;
use transito_api::database::Record;

async fn login(server: &common::TestServer, username: &str, password: &str) -> Result<reqwest::Response> {
    Ok(reqwest::Client::new()
        .post(server.url("/api/auth/login"))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await?)
}

#[tokio::test]
async fn register_then_login() -> Result<()> {
    let server = common::ensure_server().await?;
    let username = common::unique_username("ana");
    common::register(server, &username, "s3creta").await?;

    let res = login(server, &username, "s3creta").await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert!(body["data"]["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["data"]["user"]["username"], username.as_str());
    assert_eq!(body["data"]["user"]["rol"], "ciudadano");
    assert!(body["data"]["user"].get("contrasena").is_none());
    Ok(())
}

#[tokio::test]
async fn register_defaults_role_and_rejects_duplicates() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let username = common::unique_username("bruno");

    let res = client
        .post(server.url("/api/auth/register"))
        .json(&json!({ "username": username, "password": "clave" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["user"]["rol"], "ciudadano");
    assert_eq!(body["data"]["user"]["estado"], 1);

    let again = client
        .post(server.url("/api/auth/register"))
        .json(&json!({ "username": username, "password": "otra" }))
        .send()
        .await?;
    assert_eq!(again.status(), StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn register_ignores_a_requested_role() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/api/auth/register"))
        .json(&json!({ "username": common::unique_username("colado"), "password": "clave", "rol": "admin" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["user"]["rol"], "ciudadano");

    let token = body["data"]["token"].as_str().unwrap_or_default();
    let res = client.get(server.url("/api/quejas")).bearer_auth(token).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn register_validates_input() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let missing = client
        .post(server.url("/api/auth/register"))
        .json(&json!({ "username": "sinclave" }))
        .send()
        .await?;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let short = client
        .post(server.url("/api/auth/register"))
        .json(&json!({ "username": "ab", "password": "clave" }))
        .send()
        .await?;
    assert_eq!(short.status(), StatusCode::BAD_REQUEST);
    let body: Value = short.json().await?;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["field_errors"]["username"].is_string());
    Ok(())
}

#[tokio::test]
async fn login_failures() -> Result<()> {
    let server = common::ensure_server().await?;
    let username = common::unique_username("carla");
    common::register(server, &username, "correcta").await?;

    assert_eq!(login(server, &username, "incorrecta").await?.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(login(server, "nadie_registrado", "x").await?.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(login(server, &username, "").await?.status(), StatusCode::BAD_REQUEST);

    let res = reqwest::Client::new()
        .post(server.url("/api/auth/login"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], true);
    Ok(())
}

#[tokio::test]
async fn inactive_users_cannot_log_in() -> Result<()> {
    let server = common::ensure_server().await?;
    let username = common::unique_username("inactivo");

    let mut record = Record::new();
    record.insert("username".into(), json!(username));
    record.insert("contrasena".into(), json!(transito_api::auth::hash_password("clave")?.to_string()));
    record.insert("rol".into(), json!("ciudadano"));
    record.insert("estado".into(), json!(0));
    server.state.usuarios.create(record).await?;

    assert_eq!(login(server, &username, "clave").await?.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn legacy_hash_is_upgraded_on_login() -> Result<()> {
    let server = common::ensure_server().await?;
    let username = common::unique_username("legado");

    let mut record = Record::new();
    record.insert("username".into(), json!(username));
    record.insert("contrasena".into(), json!(PasswordHash::legacy(b"\x01\x02\x03\x04", "antigua").to_string()));
    record.insert("rol".into(), json!("ciudadano"));
    record.insert("estado".into(), json!(1));
    server.state.usuarios.create(record).await?;

    assert_eq!(login(server, &username, "antigua").await?.status(), StatusCode::OK);

    let stored = usuario::find_by_username(&server.state.usuarios, &username)
        .await?
        .and_then(|u| u.contrasena)
        .expect("stored hash");
    let parsed = PasswordHash::parse(&stored).expect("parsable hash");
    assert!(!parsed.needs_rehash());
    assert!(parsed.verify("antigua"));

    assert_eq!(login(server, &username, "antigua").await?.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn me_requires_a_valid_token() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client.get(server.url("/api/auth/me")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await?;
    assert_eq!(body["code"], "UNAUTHORIZED");

    let res = client
        .get(server.url("/api/auth/me"))
        .bearer_auth("not.a.token")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let username = common::unique_username("dora");
    let token = common::register(server, &username, "clave").await?;
    let res = client.get(server.url("/api/auth/me")).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["username"], username.as_str());
    assert!(body["data"].get("contrasena").is_none());
    Ok(())
}

#[tokio::test]
async fn change_password_flow() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let username = common::unique_username("elena");
    let token = common::register(server, &username, "vieja").await?;

    let change = |current: &'static str, new: &'static str| {
        client
            .post(server.url("/api/auth/change-password"))
            .bearer_auth(&token)
            .json(&json!({ "currentPassword": current, "newPassword": new }))
            .send()
    };

    assert_eq!(change("", "nueva").await?.status(), StatusCode::BAD_REQUEST);
    assert_eq!(change("equivocada", "nueva").await?.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(change("vieja", "nueva").await?.status(), StatusCode::OK);

    assert_eq!(login(server, &username, "vieja").await?.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(login(server, &username, "nueva").await?.status(), StatusCode::OK);
    Ok(())
}
