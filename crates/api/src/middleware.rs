use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::app::errors::ApiError;
use crate::app::services::AppServices;

#[derive(Clone)]
pub struct AuthState {
    pub services: Arc<AppServices>,
}

/// Require a valid bearer token; inserts the caller's `PrincipalContext`.
pub async fn auth_middleware(State(state): State<AuthState>, mut req: Request, next: Next) -> Result<Response, ApiError> {
    let token = extract_bearer(req.headers())?.ok_or_else(|| ApiError::unauthenticated("missing bearer token"))?;
    let principal = state.services.authenticate(token)?;
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Like [`auth_middleware`], but lets anonymous requests through.
///
/// A token that is present must still be valid.
pub async fn optional_auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(token) = extract_bearer(req.headers())? {
        let principal = state.services.authenticate(token)?;
        req.extensions_mut().insert(principal);
    }
    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<Option<&str>, ApiError> {
    let Some(header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let token = header
        .to_str()
        .ok()
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthenticated("malformed authorization header"))?;

    Ok(Some(token))
}
