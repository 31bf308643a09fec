//! Boundary mapping from service failures to HTTP responses.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use datavault_service::ServiceError;
use serde_json::json;

/// Body of every rejected unauthenticated or badly authenticated call.
pub const UNAUTHENTICATED_MESSAGE: &str = "valid authentication required";

const INTERNAL_MESSAGE: &str = "internal error";

/// Errors returned by the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A vault operation failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The request body or path could not be decoded.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The interceptor refused the call. The cause is not carried.
    #[error("valid authentication required")]
    Unauthenticated,
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Service(err) => match err {
                ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
                ServiceError::Authentication(_) | ServiceError::MissingIdentity => {
                    StatusCode::UNAUTHORIZED
                }
                ServiceError::DuplicateLogin { .. } => StatusCode::CONFLICT,
                ServiceError::Crypto(_) | ServiceError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// Caller-visible message. Crypto and internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            Self::BadRequest(msg) => msg.clone(),
            Self::Unauthenticated | Self::Service(ServiceError::MissingIdentity) => {
                UNAUTHENTICATED_MESSAGE.to_owned()
            }
            Self::Service(ServiceError::Crypto(_) | ServiceError::Internal(_)) => {
                INTERNAL_MESSAGE.to_owned()
            }
            Self::Service(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({"error": self.public_message()}))).into_response()
    }
}
