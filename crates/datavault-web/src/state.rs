//! Shared application state for the web server.
//!
//! [`AppState`] is wrapped in an `Arc` and shared across all request
//! handlers and the access interceptor. Nothing in it is mutable after
//! startup.

use std::sync::Arc;

use datavault_service::VaultService;
use datavault_vault::TokenService;

use crate::WebConfig;

/// Shared state accessible from every Axum handler.
#[derive(Clone)]
pub struct AppState {
    /// The vault orchestrator.
    pub service: Arc<VaultService>,

    /// Web server configuration.
    pub config: WebConfig,
}

impl AppState {
    pub fn new(service: Arc<VaultService>, config: WebConfig) -> Self {
        Self { service, config }
    }

    /// The token service the interceptor verifies against.
    pub fn tokens(&self) -> &TokenService {
        self.service.tokens()
    }
}
