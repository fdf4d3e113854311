use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::AppState;

/// Identity of the caller, inserted into request extensions by [`require_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub u64);

/// Reject requests without a valid bearer token; otherwise bind [`AuthUser`].
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = state.tokens.verify_headers(req.headers())?;
    req.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(req).await)
}
