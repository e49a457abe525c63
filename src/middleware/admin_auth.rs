use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::db::AppState;
use crate::error::AppError;

/// Pull the token out of an `Authorization: Bearer <token>` header.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Gate admin routes behind the configured bearer token.
///
/// A deployment without `LICENSE_SERVER_ADMIN_TOKEN` set cannot serve
/// admin requests at all: 503 rather than 401, so operators can tell a
/// misconfigured server from a bad credential.
pub async fn admin_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Err(AppError::AdminNotConfigured);
    };

    let presented = extract_bearer_token(request.headers()).ok_or(AppError::Unauthorized)?;

    // ct_eq needs equal lengths; a length mismatch is already a reject.
    if presented.len() != expected.len()
        || presented.as_bytes().ct_eq(expected.as_bytes()).unwrap_u8() != 1
    {
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}
