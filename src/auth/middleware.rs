//! Authentication middleware for axum.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::{JwtManager, TokenKind};

/// Error response for authentication failures.
#[derive(Debug, Serialize)]
pub struct AuthError {
    pub error: String,
    pub code: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, Json(self)).into_response()
    }
}

/// Extract and validate a Bearer access token.
///
/// Expects `Authorization: Bearer <token>`. On success the token's
/// claims are inserted into the request extensions for handlers.
pub async fn require_auth(
    State(jwt_manager): State<JwtManager>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AuthError {
            error: "Missing authorization token".to_string(),
            code: "MISSING_TOKEN".to_string(),
        })?;

    let claims = jwt_manager
        .validate(token, TokenKind::Access)
        .map_err(|e| {
            tracing::debug!(error = %e, "Access token validation failed");
            AuthError {
                error: "Invalid or expired token".to_string(),
                code: "INVALID_TOKEN".to_string(),
            }
        })?;

    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}
