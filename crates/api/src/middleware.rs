use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use factha_auth::JwtValidator;

use crate::app::errors::ApiError;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(req.headers())?;

    let claims = state.jwt.validate(token, Utc::now()).map_err(|e| {
        tracing::debug!(error = %e, "rejected bearer token");
        ApiError::Unauthorized(format!("invalid token: {e}"))
    })?;

    req.extensions_mut()
        .insert(PrincipalContext::from_claims(claims));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, ApiError> {
    let missing = || ApiError::Unauthorized("missing bearer token".to_string());

    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(missing)?;

    let header = header.to_str().map_err(|_| missing())?;

    let header = header.strip_prefix("Bearer ").ok_or_else(missing)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(missing());
    }

    Ok(token)
}
