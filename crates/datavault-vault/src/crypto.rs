//! AES-GCM envelope encryption using the `ring` crate.
//!
//! An *envelope* is the single opaque byte string stored for every secret:
//!
//! ```text
//! ┌──────────────┬──────────────────────────────┬──────────────┐
//! │ nonce (12 B) │ ciphertext (len(plaintext))  │ tag (16 B)   │
//! └──────────────┴──────────────────────────────┴──────────────┘
//! ```
//!
//! - The cipher is picked from the key length: 16 bytes selects AES-128-GCM,
//!   32 bytes selects AES-256-GCM. Any other length is rejected.
//! - A fresh 96-bit nonce is drawn from the system CSPRNG for every call to
//!   [`encrypt`]; a nonce is never derived from a counter or reused.
//! - [`decrypt`] either returns exactly the sealed plaintext or fails with
//!   [`VaultError::DecryptionFailed`]. It never returns partial output.

use ring::aead::{self, Aad, BoundKey, NONCE_LEN, Nonce, NonceSequence, SealingKey, UnboundKey};
use ring::hmac;
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::{Result, VaultError};

/// Length of an AES-128-GCM key in bytes.
pub const KEY_LEN_128: usize = 16;

/// Length of an AES-256-GCM key in bytes.
pub const KEY_LEN: usize = 32;

/// Length of the GCM nonce in bytes (96 bits).
pub const NONCE_LEN_BYTES: usize = NONCE_LEN;

/// Length of the GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

// ---------------------------------------------------------------------------
// Nonce handling
// ---------------------------------------------------------------------------

/// A single-use nonce sequence that yields exactly one nonce and then errors.
///
/// `ring` requires a [`NonceSequence`] for sealing and opening keys. Each
/// key built here is used for exactly one operation.
struct SingleNonce(Option<[u8; NONCE_LEN_BYTES]>);

impl SingleNonce {
    fn new(bytes: [u8; NONCE_LEN_BYTES]) -> Self {
        Self(Some(bytes))
    }
}

impl NonceSequence for SingleNonce {
    fn advance(&mut self) -> std::result::Result<Nonce, ring::error::Unspecified> {
        self.0
            .take()
            .map(Nonce::assume_unique_for_key)
            .ok_or(ring::error::Unspecified)
    }
}

/// Select the AEAD algorithm matching `key`'s length.
fn algorithm_for(key: &[u8]) -> Result<&'static aead::Algorithm> {
    match key.len() {
        KEY_LEN_128 => Ok(&aead::AES_128_GCM),
        KEY_LEN => Ok(&aead::AES_256_GCM),
        other => Err(VaultError::InvalidKey {
            reason: format!("AES-GCM key must be {KEY_LEN_128} or {KEY_LEN} bytes, got {other}"),
        }),
    }
}

// ---------------------------------------------------------------------------
// Encryption
// ---------------------------------------------------------------------------

/// Seal `plaintext` under `key` and return the envelope `nonce || ciphertext || tag`.
///
/// # Errors
///
/// Returns [`VaultError::InvalidKey`] if the key length selects no cipher,
/// or [`VaultError::EncryptionFailed`] if the CSPRNG or `ring` fails.
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let algorithm = algorithm_for(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN_BYTES];
    SystemRandom::new()
        .fill(&mut nonce_bytes)
        .map_err(|_| VaultError::EncryptionFailed {
            reason: "failed to generate random nonce".into(),
        })?;

    let unbound_key = UnboundKey::new(algorithm, key).map_err(|_| VaultError::InvalidKey {
        reason: "failed to create AES-GCM key".into(),
    })?;
    let mut sealing_key = SealingKey::new(unbound_key, SingleNonce::new(nonce_bytes));

    // `ring` encrypts in place and appends the tag.
    let mut in_out = plaintext.to_vec();
    sealing_key
        .seal_in_place_append_tag(Aad::empty(), &mut in_out)
        .map_err(|_| VaultError::EncryptionFailed {
            reason: "seal_in_place failed".into(),
        })?;

    let mut envelope = Vec::with_capacity(NONCE_LEN_BYTES + in_out.len());
    envelope.extend_from_slice(&nonce_bytes);
    envelope.extend_from_slice(&in_out);

    tracing::trace!(
        plaintext_len = plaintext.len(),
        envelope_len = envelope.len(),
        "sealed envelope"
    );

    Ok(envelope)
}

/// Open an envelope produced by [`encrypt`] under the same `key`.
///
/// # Errors
///
/// Returns [`VaultError::InvalidKey`] if the key length selects no cipher,
/// and [`VaultError::DecryptionFailed`] if the envelope is shorter than a
/// nonce or the tag does not verify (wrong key or tampered bytes).
pub fn decrypt(key: &[u8], envelope: &[u8]) -> Result<Vec<u8>> {
    let algorithm = algorithm_for(key)?;

    if envelope.len() < NONCE_LEN_BYTES {
        return Err(VaultError::DecryptionFailed {
            reason: format!(
                "envelope is {} bytes, shorter than the {NONCE_LEN_BYTES}-byte nonce",
                envelope.len()
            ),
        });
    }

    let (nonce_slice, sealed) = envelope.split_at(NONCE_LEN_BYTES);
    let mut nonce_bytes = [0u8; NONCE_LEN_BYTES];
    nonce_bytes.copy_from_slice(nonce_slice);

    let unbound_key = UnboundKey::new(algorithm, key).map_err(|_| VaultError::InvalidKey {
        reason: "failed to create AES-GCM key".into(),
    })?;
    let mut opening_key = aead::OpeningKey::new(unbound_key, SingleNonce::new(nonce_bytes));

    let mut in_out = sealed.to_vec();
    let plaintext = opening_key
        .open_in_place(Aad::empty(), &mut in_out)
        .map_err(|_| VaultError::DecryptionFailed {
            reason: "authentication failed: wrong key or corrupted data".into(),
        })?;

    let result = plaintext.to_vec();

    tracing::trace!(
        envelope_len = envelope.len(),
        plaintext_len = result.len(),
        "opened envelope"
    );

    Ok(result)
}

// ---------------------------------------------------------------------------
// Cipher
// ---------------------------------------------------------------------------

/// A validated AES-GCM key, built once at startup and shared read-only.
#[derive(Clone)]
pub struct Cipher {
    key: Vec<u8>,
}

impl Cipher {
    /// Wrap `key`, rejecting lengths that select no cipher.
    pub fn new(key: &[u8]) -> Result<Self> {
        algorithm_for(key)?;
        Ok(Self { key: key.to_vec() })
    }

    /// Key size in bits (128 or 256).
    pub fn key_bits(&self) -> usize {
        self.key.len() * 8
    }

    /// Seal `plaintext` into a fresh envelope.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        encrypt(&self.key, plaintext)
    }

    /// Open an envelope sealed under this key.
    pub fn open(&self, envelope: &[u8]) -> Result<Vec<u8>> {
        decrypt(&self.key, envelope)
    }
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher")
            .field("key_bits", &self.key_bits())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// Compare two secret byte strings in constant time.
///
/// Both inputs are MACed under a throwaway random key and the tags are
/// compared with `ring::hmac::verify`, so timing does not depend on where
/// the inputs first differ.
pub fn secrets_match(expected: &[u8], candidate: &[u8]) -> bool {
    let rng = SystemRandom::new();
    let Ok(key) = hmac::Key::generate(hmac::HMAC_SHA256, &rng) else {
        tracing::warn!("CSPRNG failure while comparing secrets");
        return false;
    };
    let tag = hmac::sign(&key, expected);
    hmac::verify(&key, candidate, tag.as_ref()).is_ok()
}

// ---------------------------------------------------------------------------
// Random bytes
// ---------------------------------------------------------------------------

/// Generate `len` cryptographically secure random bytes.
///
/// # Errors
///
/// Returns [`VaultError::Internal`] if the system CSPRNG fails.
pub fn random_bytes(len: usize) -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let mut buf = vec![0u8; len];
    rng.fill(&mut buf)
        .map_err(|_| VaultError::Internal("failed to generate random bytes".into()))?;
    Ok(buf)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
