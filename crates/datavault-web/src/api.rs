//! REST API route handlers.
//!
//! Thin adapters between JSON bodies and [`VaultService`] calls. Binary
//! payloads cross the wire as standard base64.
//!
//! [`VaultService`]: datavault_service::VaultService

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::{DateTime, Utc};
use datavault_service::Secret;
use datavault_vault::IssuedToken;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::interceptor::Caller;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Register / Login
// ---------------------------------------------------------------------------

/// Request body for register and login.
#[derive(Deserialize)]
pub struct CredentialsBody {
    pub login: String,
    pub password: String,
}

/// Response payload carrying a freshly issued token.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl From<IssuedToken> for TokenResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            expires_at: issued.claims.expires_at(),
            token: issued.token,
        }
    }
}

/// POST /api/v1/register: Create an account and return its first token.
pub async fn register(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CredentialsBody>, JsonRejection>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let Json(body) = body?;
    let issued = state.service.register(&body.login, &body.password).await?;
    Ok((StatusCode::CREATED, Json(issued.into())))
}

/// POST /api/v1/login: Exchange a login/password pair for a token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CredentialsBody>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(body) = body?;
    let issued = state.service.login(&body.login, &body.password).await?;
    Ok(Json(issued.into()))
}

// ---------------------------------------------------------------------------
// Secrets
// ---------------------------------------------------------------------------

/// Request body for storing a secret.
#[derive(Deserialize)]
pub struct StoreBody {
    pub kind: String,
    /// Base64-encoded payload.
    pub data: String,
}

/// Response payload for a stored secret.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoreResponse {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// One decrypted secret as returned by retrieve.
#[derive(Debug, Serialize, Deserialize)]
pub struct SecretResponse {
    pub id: String,
    pub owner: String,
    pub kind: String,
    pub status: String,
    /// Base64-encoded payload.
    pub data: String,
    pub created_at: DateTime<Utc>,
}

impl From<Secret> for SecretResponse {
    fn from(secret: Secret) -> Self {
        Self {
            data: B64.encode(&secret.data),
            id: secret.id,
            owner: secret.owner,
            kind: secret.kind.to_string(),
            status: secret.status.to_string(),
            created_at: secret.created_at,
        }
    }
}

/// Response payload for retrieve.
#[derive(Debug, Serialize, Deserialize)]
pub struct SecretList {
    pub secrets: Vec<SecretResponse>,
}

/// POST /api/v1/secrets: Encrypt and store a payload for the caller.
pub async fn store(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    body: Result<Json<StoreBody>, JsonRejection>,
) -> Result<(StatusCode, Json<StoreResponse>), ApiError> {
    let Json(body) = body?;
    let data = B64
        .decode(body.data.as_bytes())
        .map_err(|e| ApiError::BadRequest(format!("data is not valid base64: {e}")))?;

    let receipt = state.service.store(&identity, &body.kind, &data).await?;
    Ok((
        StatusCode::CREATED,
        Json(StoreResponse {
            id: receipt.id,
            created_at: receipt.created_at,
        }),
    ))
}

/// GET /api/v1/secrets: List the caller's decrypted secrets, newest first.
pub async fn retrieve(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
) -> Result<Json<SecretList>, ApiError> {
    let secrets = state.service.retrieve(&identity).await?;
    Ok(Json(SecretList {
        secrets: secrets.into_iter().map(SecretResponse::from).collect(),
    }))
}

/// DELETE /api/v1/secrets/{id}: Delete one of the caller's secrets.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = id?;
    state.service.delete(&identity, &id).await?;
    Ok(Json(json!({"deleted": true})))
}

// ---------------------------------------------------------------------------
// Ping
// ---------------------------------------------------------------------------

/// GET /api/v1/ping: Confirm the server and its database answer.
pub async fn ping(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
) -> Result<Json<Value>, ApiError> {
    state.service.ping(&identity).await?;
    Ok(Json(json!({"status": "ok"})))
}
