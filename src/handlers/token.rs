// handlers/token.rs - Credential exchange for a bearer token

use axum::{
    extract::State,
    routing::{post, MethodRouter},
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::app::AppState;
use crate::auth::{generate_jwt, Claims};
use crate::config::config;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::tenancy::{context::run_as, Actor};

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

pub fn routes() -> Vec<(&'static str, MethodRouter<AppState>)> {
    vec![("/api/token/", post(obtain_token))]
}

/// POST /api/token/
///
/// Exempt from company scoping, so the lookup runs as the system actor.
async fn obtain_token(State(state): State<AppState>, ApiJson(body): ApiJson<TokenRequest>) -> ApiResult<Value> {
    if body.username.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::bad_request("username and password are required"));
    }

    let user = run_as(Actor::system(), state.users.authenticate(body.username.trim(), &body.password)).await?;
    let claims = Claims::for_user(&user).ok_or_else(|| ApiError::internal_server_error("User has no id"))?;
    let token = generate_jwt(&claims)?;
    info!("Issued token for {}", user.username);

    Ok(ApiResponse::success(json!({
        "token": token,
        "expires_in": config().security.jwt_expiry_hours * 3600,
        "user": user.to_public(),
    })))
}
