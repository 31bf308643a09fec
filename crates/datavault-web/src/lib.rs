//! HTTP/JSON gateway for DataVault.
//!
//! This crate exposes the vault operations over axum:
//!
//! - `POST /api/v1/register` and `POST /api/v1/login` (no token required).
//! - `POST /api/v1/secrets`, `GET /api/v1/secrets` and
//!   `DELETE /api/v1/secrets/{id}` (require `Authorization: Bearer <token>`).
//!
//! Every matched route passes through the access interceptor in
//! [`interceptor`], which binds a verified caller identity before any
//! protected handler runs.

pub mod api;
pub mod error;
pub mod interceptor;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use server::{WebServer, router, shutdown_signal};
pub use state::AppState;

/// Default cap on request bodies (8 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 8 * 1024 * 1024;

/// Web server configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// The address to bind the HTTP server to.
    pub bind_addr: String,
    /// The port to listen on.
    pub port: u16,
    /// Maximum accepted request body in bytes.
    pub body_limit: usize,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".into(),
            port: 8080,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}
