//! Login and token probe handlers.

use crate::error::{Error, Result};
use crate::http::{bearer_token, AppState};
use crate::service;
use axum::extract::{Request, State};
use axum::response::Json;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email or username.
    pub username: String,
    pub password: String,
}

/// `POST /api/v1/auth/login`
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<service::auth::LoginResponse>> {
    let storage = state.storage.lock();
    let response = service::auth::login(&storage, &state.signer, &body.username, &body.password)?;
    Ok(Json(response))
}

/// `GET /api/v1/auth/me` — probes whether the presented token is
/// still valid. Any role passes; only the signature and expiry count.
pub async fn me(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<serde_json::Value>> {
    let token = bearer_token(&request).ok_or(Error::Authentication)?;
    let claims = state.signer.verify(token)?;
    Ok(Json(serde_json::json!({
        "message": format!("Token is valid for user {}", claims.sub),
    })))
}
