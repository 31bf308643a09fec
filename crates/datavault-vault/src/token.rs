//! Stateless identity tokens signed with HMAC-SHA256.
//!
//! A token is a compact JWS (`HS256`):
//!
//! ```text
//! base64url(header) . base64url(claims) . base64url(HMAC-SHA256(header.claims))
//! ```
//!
//! with `header = {"alg":"HS256","typ":"JWT"}` and
//! `claims = {"login": .., "iat": .., "exp": ..}` (Unix seconds).
//!
//! Possession of a token with a valid signature inside its
//! `[iat, exp]` window is proof of identity. There is no server-side
//! session table, so a token cannot be revoked before `exp`.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use chrono::{DateTime, Duration, Utc};
use ring::hmac;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};

/// Default validity window for issued tokens.
pub const DEFAULT_TTL_HOURS: i64 = 24;

/// Minimum accepted signing key length in bytes (one SHA-256 block half).
pub const MIN_SIGNING_KEY_LEN: usize = 32;

const ALGORITHM: &str = "HS256";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// The signed claim set carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// The authenticated login.
    pub login: String,
    /// Issued-at, Unix seconds.
    pub iat: i64,
    /// Expires-at, Unix seconds.
    pub exp: i64,
}

impl Claims {
    /// Issued-at as a UTC timestamp.
    pub fn issued_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.iat, 0).unwrap_or_default()
    }

    /// Expires-at as a UTC timestamp.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }
}

/// A freshly issued token together with the claims it encodes.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The compact, URL-safe token string handed to the caller.
    pub token: String,
    /// The claims signed into `token`.
    pub claims: Claims,
}

/// Issues and verifies identity tokens under one immutable signing key.
#[derive(Clone)]
pub struct TokenService {
    key: hmac::Key,
    ttl: Duration,
}

impl TokenService {
    /// Build a token service from the raw signing key and validity window.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidKey`] if the key is shorter than
    /// [`MIN_SIGNING_KEY_LEN`], or the window is not positive or pushes
    /// expiry past the representable date range.
    pub fn new(signing_key: &[u8], ttl: Duration) -> Result<Self> {
        if signing_key.len() < MIN_SIGNING_KEY_LEN {
            return Err(VaultError::InvalidKey {
                reason: format!(
                    "signing key must be at least {MIN_SIGNING_KEY_LEN} bytes, got {}",
                    signing_key.len()
                ),
            });
        }
        if ttl <= Duration::zero() {
            return Err(VaultError::InvalidKey {
                reason: "token validity window must be positive".into(),
            });
        }
        if Utc::now().checked_add_signed(ttl).is_none() {
            return Err(VaultError::InvalidKey {
                reason: format!(
                    "token validity window of {} hours is too large",
                    ttl.num_hours()
                ),
            });
        }

        Ok(Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, signing_key),
            ttl,
        })
    }

    /// The validity window applied to newly issued tokens.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `login`, valid from now for [`Self::ttl`].
    pub fn issue(&self, login: &str) -> Result<IssuedToken> {
        self.issue_at(login, Utc::now())
    }

    /// Issue a token for `login` as if the current time were `now`.
    pub fn issue_at(&self, login: &str, now: DateTime<Utc>) -> Result<IssuedToken> {
        if login.is_empty() {
            return Err(VaultError::Internal(
                "cannot issue a token for an empty login".into(),
            ));
        }

        let expiry = now.checked_add_signed(self.ttl).ok_or_else(|| {
            VaultError::Internal(format!("token expiry overflows for issue time {now}"))
        })?;
        let claims = Claims {
            login: login.to_string(),
            iat: now.timestamp(),
            exp: expiry.timestamp(),
        };
        let header = Header {
            alg: ALGORITHM.into(),
            typ: "JWT".into(),
        };

        let mut token = format!(
            "{}.{}",
            B64.encode(serde_json::to_vec(&header)?),
            B64.encode(serde_json::to_vec(&claims)?)
        );
        let tag = hmac::sign(&self.key, token.as_bytes());
        token.push('.');
        token.push_str(&B64.encode(tag.as_ref()));

        tracing::trace!(login = %claims.login, exp = claims.exp, "issued identity token");

        Ok(IssuedToken { token, claims })
    }

    /// Verify `token` against the current time and return its claims.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        self.verify_at(token, Utc::now())
    }

    /// Verify `token` as if the current time were `now`.
    ///
    /// The signature is checked before any claim is decoded, so nothing from
    /// an unsigned payload is trusted.
    ///
    /// # Errors
    ///
    /// - [`VaultError::TokenMalformed`] for a bad structure, encoding,
    ///   algorithm, or empty login.
    /// - [`VaultError::TokenSignature`] if the MAC does not match.
    /// - [`VaultError::TokenNotYetValid`] / [`VaultError::TokenExpired`]
    ///   outside `[iat, exp]`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims> {
        let mut segments = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(malformed("expected three dot-separated segments"));
        };

        let signature = B64
            .decode(signature_b64)
            .map_err(|_| malformed("signature is not base64url"))?;
        let signing_input = &token[..header_b64.len() + 1 + claims_b64.len()];
        hmac::verify(&self.key, signing_input.as_bytes(), &signature)
            .map_err(|_| VaultError::TokenSignature)?;

        let header: Header = decode_segment(header_b64, "header")?;
        if header.alg != ALGORITHM {
            return Err(malformed("unsupported signing algorithm"));
        }

        let claims: Claims = decode_segment(claims_b64, "claims")?;
        if claims.login.is_empty() {
            return Err(malformed("empty login claim"));
        }

        let now = now.timestamp();
        if now < claims.iat {
            return Err(VaultError::TokenNotYetValid);
        }
        if now > claims.exp {
            return Err(VaultError::TokenExpired);
        }

        Ok(claims)
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &ALGORITHM)
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish_non_exhaustive()
    }
}

fn malformed(reason: &str) -> VaultError {
    VaultError::TokenMalformed {
        reason: reason.to_string(),
    }
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str, what: &str) -> Result<T> {
    let bytes = B64
        .decode(segment)
        .map_err(|_| malformed(&format!("{what} is not base64url")))?;
    serde_json::from_slice(&bytes).map_err(|_| malformed(&format!("{what} is not valid JSON")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
