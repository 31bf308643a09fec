//! Server configuration.
//!
//! Built once at startup and never mutated. Sources, lowest to highest
//! precedence:
//!
//! 1. built-in defaults,
//! 2. the `[server]` table of `config/default.toml` (or `--config <path>`),
//! 3. `.env` and the process environment (`RUN_ADDRESS`, `DATABASE_URI`,
//!    `ENCRYPTION_KEY`, `JWT_SECRET`, `TOKEN_TTL_HOURS`),
//! 4. `serve` command-line flags.
//!
//! Both keys are mandatory and base64-encoded.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::Duration;
use datavault_vault::crypto::{KEY_LEN, KEY_LEN_128};
use datavault_vault::token::{DEFAULT_TTL_HOURS, MIN_SIGNING_KEY_LEN};
use datavault_web::WebConfig;
use serde::Deserialize;

use crate::cli::ServeArgs;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATABASE: &str = "data/datavault.db";
/// Longest accepted token validity window: one year.
pub const MAX_TTL_HOURS: i64 = 24 * 366;

// ---------------------------------------------------------------------------
// File layer
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    server: ServerSection,
}

/// The `[server]` table. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServerSection {
    bind: Option<String>,
    port: Option<u16>,
    database: Option<PathBuf>,
    token_ttl_hours: Option<i64>,
    encryption_key: Option<String>,
    signing_key: Option<String>,
}

/// Read the `[server]` table.
///
/// An explicitly requested file must exist; the default path is optional.
fn read_file_layer(explicit: Option<&Path>) -> Result<ServerSection> {
    let (path, required) = match explicit {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_CONFIG_PATH), false),
    };

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(ServerSection::default());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    parse_file_layer(&content).with_context(|| format!("invalid config file {}", path.display()))
}

fn parse_file_layer(content: &str) -> Result<ServerSection> {
    let file: FileConfig = toml::from_str(content)?;
    Ok(file.server)
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

/// Fully resolved gateway configuration.
#[derive(Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub database: PathBuf,
    pub token_ttl: Duration,
    /// Raw AEAD key, 16 or 32 bytes.
    pub encryption_key: Vec<u8>,
    /// Raw HMAC signing key, at least 32 bytes.
    pub signing_key: Vec<u8>,
}

impl ServerConfig {
    /// Resolve the configuration from every source.
    pub fn load(args: &ServeArgs) -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(e).context("failed to load .env");
            }
        }
        let file = read_file_layer(args.config.as_deref())?;
        Self::resolve(file, |key| std::env::var(key).ok(), args)
    }

    /// Merge the layers. `env` looks up one variable by name.
    fn resolve(
        file: ServerSection,
        env: impl Fn(&str) -> Option<String>,
        args: &ServeArgs,
    ) -> Result<Self> {
        let mut bind = file.bind.unwrap_or_else(|| DEFAULT_BIND.to_owned());
        let mut port = file.port.unwrap_or(DEFAULT_PORT);
        let mut database = file
            .database
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE));
        let mut ttl_hours = file.token_ttl_hours.unwrap_or(DEFAULT_TTL_HOURS);
        let mut encryption_key = file.encryption_key;
        let mut signing_key = file.signing_key;

        if let Some(addr) = env("RUN_ADDRESS") {
            (bind, port) = parse_run_address(&addr)?;
        }
        if let Some(uri) = env("DATABASE_URI") {
            database = PathBuf::from(uri);
        }
        if let Some(hours) = env("TOKEN_TTL_HOURS") {
            ttl_hours = hours
                .trim()
                .parse()
                .with_context(|| format!("TOKEN_TTL_HOURS is not an integer: {hours}"))?;
        }
        if let Some(key) = env("ENCRYPTION_KEY") {
            encryption_key = Some(key);
        }
        if let Some(key) = env("JWT_SECRET") {
            signing_key = Some(key);
        }

        if let Some(b) = &args.bind {
            bind = b.clone();
        }
        if let Some(p) = args.port {
            port = p;
        }
        if let Some(d) = &args.database {
            database = d.clone();
        }

        if !(1..=MAX_TTL_HOURS).contains(&ttl_hours) {
            bail!("token TTL must be between 1 and {MAX_TTL_HOURS} hours, got {ttl_hours}");
        }
        let token_ttl = Duration::try_hours(ttl_hours)
            .with_context(|| format!("token TTL of {ttl_hours} hours is out of range"))?;

        let encryption_key = decode_key(
            encryption_key.as_deref(),
            "ENCRYPTION_KEY",
            "run `datavault keygen` to create one",
        )?;
        if encryption_key.len() != KEY_LEN_128 && encryption_key.len() != KEY_LEN {
            bail!(
                "ENCRYPTION_KEY must decode to {KEY_LEN_128} or {KEY_LEN} bytes, got {}",
                encryption_key.len()
            );
        }

        let signing_key = decode_key(
            signing_key.as_deref(),
            "JWT_SECRET",
            "run `datavault keygen` to create one",
        )?;
        if signing_key.len() < MIN_SIGNING_KEY_LEN {
            bail!(
                "JWT_SECRET must decode to at least {MIN_SIGNING_KEY_LEN} bytes, got {}",
                signing_key.len()
            );
        }

        Ok(Self {
            bind,
            port,
            database,
            token_ttl,
            encryption_key,
            signing_key,
        })
    }

    /// The HTTP listener settings.
    pub fn web_config(&self) -> WebConfig {
        WebConfig {
            bind_addr: self.bind.clone(),
            port: self.port,
            ..WebConfig::default()
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind", &self.bind)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("token_ttl_hours", &self.token_ttl.num_hours())
            .field("encryption_key", &"<redacted>")
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

/// Split `host:port`. An empty host means all interfaces.
fn parse_run_address(addr: &str) -> Result<(String, u16)> {
    let Some((host, port)) = addr.trim().rsplit_once(':') else {
        bail!("RUN_ADDRESS must be host:port, got {addr:?}");
    };
    let port = port
        .parse()
        .with_context(|| format!("RUN_ADDRESS has an invalid port: {addr:?}"))?;
    let host = match host {
        "" => "0.0.0.0".to_owned(),
        h => h.to_owned(),
    };
    Ok((host, port))
}

fn decode_key(value: Option<&str>, name: &str, hint: &str) -> Result<Vec<u8>> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        bail!("{name} is not set; {hint}");
    };
    B64.decode(value)
        .with_context(|| format!("{name} is not valid base64"))
}
