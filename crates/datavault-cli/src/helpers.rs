//! Shared helper functions for the CLI.

use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use datavault_vault::crypto::{KEY_LEN, random_bytes};
use tracing_subscriber::EnvFilter;

/// Length of the generated `JWT_SECRET`, in bytes.
pub const GENERATED_SIGNING_KEY_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber with the given default log level.
///
/// `RUST_LOG` overrides `default_level` when set.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

// ---------------------------------------------------------------------------
// Key generation
// ---------------------------------------------------------------------------

/// Fresh base64 keys: `(ENCRYPTION_KEY, JWT_SECRET)`.
pub fn generate_keys() -> Result<(String, String)> {
    let encryption = random_bytes(KEY_LEN)?;
    let signing = random_bytes(GENERATED_SIGNING_KEY_LEN)?;
    Ok((B64.encode(encryption), B64.encode(signing)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_decode_to_expected_lengths() {
        let (enc, sig) = generate_keys().unwrap();
        assert_eq!(B64.decode(enc).unwrap().len(), 32);
        assert_eq!(B64.decode(sig).unwrap().len(), 64);
    }

    #[test]
    fn generated_keys_differ_between_calls() {
        let (a, _) = generate_keys().unwrap();
        let (b, _) = generate_keys().unwrap();
        assert_ne!(a, b);
    }
}
