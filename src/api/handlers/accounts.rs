use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::require_present;
use crate::api::response::{ApiError, AppJson, MessageBody};
use crate::auth::accounts;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn signup(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<SignupRequest>,
) -> Result<(StatusCode, Json<MessageBody>), ApiError> {
    require_present(&[
        ("name", req.name.as_str()),
        ("email", req.email.as_str()),
        ("password", req.password.as_str()),
    ])?;

    accounts::signup(&state.db, &req.name, &req.email, &req.password).await?;

    Ok((
        StatusCode::CREATED,
        MessageBody::json("User created successfully"),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = accounts::login(&state.db, &state.tokens, &req.email, &req.password).await?;
    Ok(Json(TokenResponse { token }))
}
