mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{TestApp, PASSWORD};

#[tokio::test]
async fn token_is_issued_for_valid_credentials() -> Result<()> {
    let app = TestApp::new().await?;

    let (status, body) = app
        .post("/api/token/", None, json!({ "username": "alice", "password": PASSWORD }))
        .await?;
    assert_eq!(status, StatusCode::OK, "unexpected body: {}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["username"], "alice");
    assert_eq!(body["data"]["user"]["company_id"], app.acme);
    assert!(body["data"]["user"].get("password_hash").is_none());
    assert!(body["data"]["expires_in"].as_u64().unwrap_or(0) > 0);

    let token = body["data"]["token"].as_str().unwrap_or_default().to_string();
    assert!(!token.is_empty());
    let (status, _) = app.request(Method::GET, "/api/exams/", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn bad_credentials_are_rejected_identically() -> Result<()> {
    let app = TestApp::new().await?;

    let (wrong_password, wrong_body) = app
        .post("/api/token/", None, json!({ "username": "alice", "password": "nope" }))
        .await?;
    let (unknown_user, unknown_body) = app
        .post("/api/token/", None, json!({ "username": "nobody", "password": PASSWORD }))
        .await?;

    assert_eq!(wrong_password, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);

    let (status, _) = app.post("/api/token/", None, json!({ "username": "", "password": "" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn invalid_bearer_token_is_unauthorized() -> Result<()> {
    let app = TestApp::new().await?;

    let (status, body) = app.request(Method::GET, "/api/exams/", Some("not-a-jwt"), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], true);

    Ok(())
}

#[tokio::test]
async fn root_and_health_are_public() -> Result<()> {
    let app = TestApp::new().await?;

    let (status, body) = app.get("/", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["store"], "memory");

    let (status, body) = app.get("/health", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");

    Ok(())
}

#[tokio::test]
async fn malformed_bodies_get_the_error_envelope() -> Result<()> {
    let app = TestApp::new().await?;

    let (status, bytes) = app.send(Method::POST, "/api/token/", None, Some(b"{\"username\":".to_vec())).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_slice(&bytes)?;
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "INVALID_JSON");

    let (status, body) = app.post("/api/token/", None, json!({ "username": "alice" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_JSON");
    assert!(body["message"].as_str().is_some_and(|m| m.contains("password")), "{}", body);

    Ok(())
}
