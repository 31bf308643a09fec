//! Access interceptor.
//!
//! Runs in front of every matched route. The operation is identified from
//! the HTTP method and the matched route template only. Register and Login
//! pass straight through; every other operation must present
//! `Authorization: Bearer <token>` with a token that verifies, and the
//! resulting [`CallIdentity`] is attached to the request before the handler
//! runs. All failure causes collapse into one `401` response.

use std::sync::Arc;

use axum::extract::{FromRequestParts, MatchedPath, Request, State};
use axum::http::request::Parts;
use axum::http::{Method, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use datavault_service::{CallIdentity, ServiceError};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;

pub const REGISTER_PATH: &str = "/api/v1/register";
pub const LOGIN_PATH: &str = "/api/v1/login";
pub const SECRETS_PATH: &str = "/api/v1/secrets";
pub const SECRET_PATH: &str = "/api/v1/secrets/{id}";
pub const PING_PATH: &str = "/api/v1/ping";

const BEARER_PREFIX: &str = "Bearer ";

// ═══════════════════════════════════════════════════════════════════════
//  Operations
// ═══════════════════════════════════════════════════════════════════════

/// The logical vault operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Register,
    Login,
    Store,
    Retrieve,
    Delete,
    Ping,
}

impl Operation {
    /// Identify the operation behind a method and matched route template.
    pub fn resolve(method: &Method, route: &str) -> Option<Self> {
        match (method, route) {
            (&Method::POST, REGISTER_PATH) => Some(Self::Register),
            (&Method::POST, LOGIN_PATH) => Some(Self::Login),
            (&Method::POST, SECRETS_PATH) => Some(Self::Store),
            (&Method::GET, SECRETS_PATH) => Some(Self::Retrieve),
            (&Method::DELETE, SECRET_PATH) => Some(Self::Delete),
            (&Method::GET, PING_PATH) => Some(Self::Ping),
            _ => None,
        }
    }

    /// Whether the operation may run without an identity.
    pub fn is_exempt(self) -> bool {
        matches!(self, Self::Register | Self::Login)
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Middleware
// ═══════════════════════════════════════════════════════════════════════

/// Gate a request on its bearer token.
///
/// Install with `route_layer` so the matched route template is available.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned());
    let operation = route
        .as_deref()
        .and_then(|route| Operation::resolve(request.method(), route));

    let Some(operation) = operation else {
        debug!(method = %request.method(), route = ?route, "rejected: unknown operation");
        return ApiError::Unauthenticated.into_response();
    };
    if operation.is_exempt() {
        return next.run(request).await;
    }

    let Some(token) = bearer_token(request.headers()) else {
        debug!(?operation, "rejected: missing or malformed authorization");
        return ApiError::Unauthenticated.into_response();
    };

    match state.tokens().verify(token) {
        Ok(claims) => {
            let identity = CallIdentity::from_claims(&claims);
            debug!(?operation, login = %identity, "caller authenticated");
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e) if e.is_token_error() => {
            debug!(?operation, reason = %e, "rejected: token did not verify");
            ApiError::Unauthenticated.into_response()
        }
        Err(e) => {
            warn!(?operation, error = %e, "rejected: token verification failed unexpectedly");
            ApiError::Unauthenticated.into_response()
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The prefix match is exact and the token must be non-empty.
fn bearer_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    match value.strip_prefix(BEARER_PREFIX) {
        Some(token) if !token.is_empty() => Some(token),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Extractor
// ═══════════════════════════════════════════════════════════════════════

/// The identity bound by [`authenticate`], pulled out of the request.
///
/// Absence means the handler was reached without passing the interceptor,
/// which surfaces as [`ServiceError::MissingIdentity`].
#[derive(Debug, Clone)]
pub struct Caller(pub CallIdentity);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallIdentity>()
            .cloned()
            .map(Caller)
            .ok_or(ApiError::Service(ServiceError::MissingIdentity))
    }
}
