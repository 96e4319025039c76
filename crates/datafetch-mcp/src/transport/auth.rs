//! HTTP authentication middleware and caller identity

use std::sync::Arc;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::constants::{ANONYMOUS_CALLER, CALLER_ID_HEADER};

/// Paths reachable without a token
const PUBLIC_PATHS: &[&str] = &["/health"];

/// Bearer token authentication configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    token: Option<Arc<str>>,
}

impl AuthConfig {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.map(Into::into),
        }
    }

    pub const fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    /// Check an `Authorization` header value against the configured token
    fn authorize(&self, header_value: Option<&str>) -> Result<(), &'static str> {
        let Some(expected) = self.token.as_deref() else {
            return Ok(());
        };

        match header_value.map(|v| v.strip_prefix("Bearer ")) {
            Some(Some(provided)) if provided == expected => Ok(()),
            Some(Some(_)) => Err("Invalid bearer token"),
            Some(None) => Err("Invalid Authorization header format"),
            None => Err("Missing Authorization header"),
        }
    }
}

/// Reject requests without the configured bearer token
pub async fn bearer_auth_middleware(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Response {
    if PUBLIC_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth.authorize(header_value) {
        Ok(()) => next.run(request).await,
        Err(reason) => {
            tracing::warn!(
                path = %request.uri().path(),
                reason,
                "Rejected unauthenticated request"
            );
            (StatusCode::UNAUTHORIZED, Json(json!({ "detail": reason }))).into_response()
        }
    }
}

/// Caller identity for logging, from the `x-caller-id` header
pub fn caller_id(headers: &HeaderMap) -> String {
    headers
        .get(CALLER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(ANONYMOUS_CALLER)
        .to_string()
}
