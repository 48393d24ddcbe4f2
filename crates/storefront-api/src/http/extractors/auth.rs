//! Bearer token authentication extractors.
//!
//! Tokens are read from:
//! - `Authorization: Bearer <token>` header
//! - `X-API-Key: <token>` header
//! - `?access_token=<token>` query parameter, for [`StreamAuthenticated`] only,
//!   since browser `EventSource` cannot set request headers.
//!
//! Tokens are SHA-256 hashed and resolved against the `api_tokens` table.

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::Deserialize;
use storefront_types::principal::Principal;

use crate::http::error::AppError;
use crate::state::AppState;

/// The caller behind a valid bearer token.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub Principal);

/// Like [`Authenticated`], but also accepts `?access_token=`.
#[derive(Debug, Clone, Copy)]
pub struct StreamAuthenticated(pub Principal);

impl Authenticated {
    /// Reject non-admin callers with 403.
    pub fn require_admin(&self) -> Result<Principal, AppError> {
        if self.0.is_admin() {
            Ok(self.0)
        } else {
            Err(AppError::Forbidden("admin role required".to_string()))
        }
    }
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = header_token(parts)?.ok_or_else(missing_token)?;
        resolve(state, &token).await.map(Authenticated)
    }
}

impl FromRequestParts<AppState> for StreamAuthenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = match header_token(parts)? {
            Some(token) => token,
            None => query_token(parts).ok_or_else(missing_token)?,
        };
        resolve(state, &token).await.map(StreamAuthenticated)
    }
}

async fn resolve(state: &AppState, token: &str) -> Result<Principal, AppError> {
    state
        .tokens
        .resolve(token)
        .await
        .map_err(|e| AppError::Internal(format!("Database error: {e}")))?
        .ok_or_else(|| AppError::Unauthorized("Invalid token.".to_string()))
}

fn missing_token() -> AppError {
    AppError::Unauthorized(
        "Missing token. Provide via 'Authorization: Bearer <token>' or 'X-API-Key: <token>' header."
            .to_string(),
    )
}

/// Extract the token from request headers, if any.
fn header_token(parts: &Parts) -> Result<Option<String>, AppError> {
    if let Some(auth) = parts.headers.get("authorization") {
        let auth_str = auth.to_str().map_err(|_| {
            AppError::Unauthorized("Invalid Authorization header encoding".to_string())
        })?;
        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            return Ok(Some(token.trim().to_string()));
        }
    }

    if let Some(key) = parts.headers.get("x-api-key") {
        let key_str = key.to_str().map_err(|_| {
            AppError::Unauthorized("Invalid X-API-Key header encoding".to_string())
        })?;
        return Ok(Some(key_str.trim().to_string()));
    }

    Ok(None)
}

#[derive(Deserialize)]
struct TokenQuery {
    access_token: Option<String>,
}

fn query_token(parts: &Parts) -> Option<String> {
    let Query(query) = Query::<TokenQuery>::try_from_uri(&parts.uri).ok()?;
    query.access_token.filter(|t| !t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_header_is_read() {
        let p = parts(Request::builder().header("authorization", "Bearer sf_abc "));
        assert_eq!(header_token(&p).unwrap().as_deref(), Some("sf_abc"));
    }

    #[test]
    fn test_api_key_header_is_read() {
        let p = parts(Request::builder().header("x-api-key", "sf_xyz"));
        assert_eq!(header_token(&p).unwrap().as_deref(), Some("sf_xyz"));
    }

    #[test]
    fn test_no_header_yields_none() {
        let p = parts(Request::builder().uri("/api/v1/chat/rooms"));
        assert!(header_token(&p).unwrap().is_none());
    }

    #[test]
    fn test_access_token_query_is_read() {
        let p = parts(Request::builder().uri("/api/v1/realtime/stream?global=true&access_token=sf_q"));
        assert_eq!(query_token(&p).as_deref(), Some("sf_q"));

        let p = parts(Request::builder().uri("/api/v1/realtime/stream?access_token="));
        assert!(query_token(&p).is_none());
    }

    #[test]
    fn test_require_admin_rejects_customers() {
        assert!(Authenticated(Principal::admin(1)).require_admin().is_ok());
        assert!(matches!(
            Authenticated(Principal::customer(2)).require_admin(),
            Err(AppError::Forbidden(_))
        ));
    }
}
