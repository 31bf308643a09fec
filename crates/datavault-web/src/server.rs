//! Main web server setup and startup.
//!
//! [`WebServer`] composes the Axum router, registers all routes behind the
//! access interceptor, and runs the HTTP listener until a shutdown signal
//! arrives.

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{delete, get, post};
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use datavault_service::VaultService;

use crate::WebConfig;
use crate::api;
use crate::interceptor::{
    self, LOGIN_PATH, PING_PATH, REGISTER_PATH, SECRET_PATH, SECRETS_PATH,
};
use crate::state::AppState;

/// The DataVault HTTP gateway.
pub struct WebServer {
    config: WebConfig,
    state: Arc<AppState>,
}

impl WebServer {
    /// Create a new web server around a ready [`VaultService`].
    pub fn new(config: WebConfig, service: Arc<VaultService>) -> Self {
        let state = Arc::new(AppState::new(service, config.clone()));
        Self { config, state }
    }

    /// Return the `host:port` string this server will bind to.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.config.bind_addr, self.config.port)
    }

    /// Build the Axum router with all routes registered.
    pub fn router(&self) -> Router {
        router(Arc::clone(&self.state))
    }

    /// Bind the configured address and serve until Ctrl-C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot be bound or the server
    /// fails while running.
    pub async fn start(self) -> std::io::Result<()> {
        let addr = self.addr();
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!(addr = %addr, "starting web server");

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        tracing::info!("web server stopped");
        Ok(())
    }
}

/// Build the gateway router over `state`.
///
/// The interceptor is installed with `route_layer`, so it runs for every
/// matched route and sees the route template; unmatched paths fall through
/// to a plain 404.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.body_limit;
    let trace = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route(REGISTER_PATH, post(api::register))
        .route(LOGIN_PATH, post(api::login))
        .route(SECRETS_PATH, post(api::store).get(api::retrieve))
        .route(SECRET_PATH, delete(api::delete))
        .route(PING_PATH, get(api::ping))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            interceptor::authenticate,
        ))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(trace)
        .with_state(state)
}

/// Resolve on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
