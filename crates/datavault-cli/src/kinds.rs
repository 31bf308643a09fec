//! Structured payloads for each secret kind.
//!
//! The server stores opaque bytes. The client encodes each kind as a small
//! JSON document so `list` can render it back.

use std::path::Path;

use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use serde::{Deserialize, Serialize};

use crate::cli::{KindArg, PutArgs};

/// Free-form text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextData {
    pub content: String,
    #[serde(default)]
    pub notes: String,
}

/// Credentials for some other service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginPasswordData {
    #[serde(default)]
    pub website: String,
    pub login: String,
    pub password: String,
    #[serde(default)]
    pub notes: String,
}

/// Bank card details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankCardData {
    #[serde(default)]
    pub bank: String,
    pub number: String,
    #[serde(default)]
    pub holder: String,
    #[serde(default)]
    pub cvv: String,
    pub exp_month: u32,
    pub exp_year: u32,
    #[serde(default)]
    pub notes: String,
}

/// A file's name and contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryData {
    pub filename: String,
    #[serde(with = "base64_bytes")]
    pub content: Vec<u8>,
    #[serde(default)]
    pub notes: String,
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as B64;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&B64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        B64.decode(encoded).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Building payloads from `put` flags
// ---------------------------------------------------------------------------

/// Encode the flags of `put` into the bytes sent to the server.
pub fn build_payload(args: &PutArgs) -> Result<Vec<u8>> {
    let notes = args.notes.clone().unwrap_or_default();
    let json = match args.kind {
        KindArg::Text => serde_json::to_vec(&TextData {
            content: required(&args.text, "--text")?,
            notes,
        })?,
        KindArg::Password => serde_json::to_vec(&LoginPasswordData {
            website: args.website.clone().unwrap_or_default(),
            login: required(&args.site_login, "--site-login")?,
            password: required(&args.site_password, "--site-password")?,
            notes,
        })?,
        KindArg::Card => {
            let exp_month = args
                .exp_month
                .context("--exp-month is required for kind card")?;
            if !(1..=12).contains(&exp_month) {
                bail!("--exp-month must be between 1 and 12, got {exp_month}");
            }
            let number = required(&args.number, "--number")?;
            if !number.chars().all(|c| c.is_ascii_digit() || c == ' ') {
                bail!("--number must contain only digits");
            }
            serde_json::to_vec(&BankCardData {
                bank: args.bank.clone().unwrap_or_default(),
                number,
                holder: args.holder.clone().unwrap_or_default(),
                cvv: args.cvv.clone().unwrap_or_default(),
                exp_month,
                exp_year: args
                    .exp_year
                    .context("--exp-year is required for kind card")?,
                notes,
            })?
        }
        KindArg::Binary => {
            let path = args
                .file
                .as_deref()
                .context("--file is required for kind binary")?;
            serde_json::to_vec(&BinaryData {
                filename: file_name(path),
                content: std::fs::read(path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                notes,
            })?
        }
    };
    Ok(json)
}

fn required(value: &Option<String>, flag: &str) -> Result<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v.clone()),
        _ => bail!("{flag} is required for this kind"),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Rendering for `list`
// ---------------------------------------------------------------------------

/// A one-line human summary of a decrypted payload.
///
/// Card numbers are masked to their last four digits and binary contents
/// are shown by size only. Payloads that don't parse as the expected shape
/// are shown as (lossy) text.
pub fn describe(kind: &str, data: &[u8]) -> String {
    let described = match kind {
        "text" => serde_json::from_slice::<TextData>(data)
            .ok()
            .map(|t| with_notes(t.content, &t.notes)),
        "password" => serde_json::from_slice::<LoginPasswordData>(data)
            .ok()
            .map(|p| with_notes(format!("{} @ {} / {}", p.login, p.website, p.password), &p.notes)),
        "card" => serde_json::from_slice::<BankCardData>(data).ok().map(|c| {
            with_notes(
                format!(
                    "{} {} {} exp {:02}/{}",
                    c.bank,
                    mask_card(&c.number),
                    c.holder,
                    c.exp_month,
                    c.exp_year
                ),
                &c.notes,
            )
        }),
        "binary" => serde_json::from_slice::<BinaryData>(data)
            .ok()
            .map(|b| with_notes(format!("{} ({} bytes)", b.filename, b.content.len()), &b.notes)),
        _ => None,
    };
    described.unwrap_or_else(|| String::from_utf8_lossy(data).into_owned())
}

fn with_notes(text: String, notes: &str) -> String {
    if notes.is_empty() {
        text
    } else {
        format!("{text}  [{notes}]")
    }
}

fn mask_card(number: &str) -> String {
    let digits: Vec<char> = number.chars().filter(char::is_ascii_digit).collect();
    let tail: String = digits[digits.len().saturating_sub(4)..].iter().collect();
    format!("**** {tail}")
}

/// Decode the base64 data field of a listed secret.
pub fn decode_data(encoded: &str) -> Result<Vec<u8>> {
    B64.decode(encoded).context("server returned invalid base64 data")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_payload() {
        let args = PutArgs {
            kind: KindArg::Text,
            text: Some("hello".into()),
            ..PutArgs::default()
        };
        let bytes = build_payload(&args).unwrap();
        let text: TextData = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(text.content, "hello");
        assert_eq!(describe("text", &bytes), "hello");
    }

    #[test]
    fn missing_required_flags() {
        for kind in [KindArg::Text, KindArg::Password, KindArg::Card, KindArg::Binary] {
            let args = PutArgs {
                kind,
                ..PutArgs::default()
            };
            assert!(build_payload(&args).is_err(), "{kind:?}");
        }
    }

    #[test]
    fn card_payload_is_validated_and_masked() {
        let mut args = PutArgs {
            kind: KindArg::Card,
            bank: Some("ACME".into()),
            number: Some("4111 1111 1111 1234".into()),
            holder: Some("ALICE".into()),
            cvv: Some("123".into()),
            exp_month: Some(13),
            exp_year: Some(2030),
            ..PutArgs::default()
        };
        assert!(build_payload(&args).is_err());

        args.exp_month = Some(7);
        let bytes = build_payload(&args).unwrap();
        let shown = describe("card", &bytes);
        assert!(shown.contains("**** 1234"));
        assert!(shown.contains("07/2030"));
        assert!(!shown.contains("4111"));
    }

    #[test]
    fn binary_payload_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        std::fs::write(&path, [0u8, 1, 2, 255]).unwrap();

        let args = PutArgs {
            kind: KindArg::Binary,
            file: Some(path),
            ..PutArgs::default()
        };
        let bytes = build_payload(&args).unwrap();
        let binary: BinaryData = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(binary.filename, "blob.bin");
        assert_eq!(binary.content, [0, 1, 2, 255]);
        assert_eq!(describe("binary", &bytes), "blob.bin (4 bytes)");
    }

    #[test]
    fn unstructured_payload_falls_back_to_text() {
        assert_eq!(describe("text", b"plain words"), "plain words");
        assert_eq!(describe("card", b"???"), "???");
    }
}
