//! CLI argument definitions for DataVault.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// DataVault -- an encrypted personal data vault.
#[derive(Parser)]
#[command(
    name = "datavault",
    version,
    about = "DataVault -- encrypted personal data vault",
    long_about = "Run the DataVault gateway, or talk to one: register, log in, and store, \
                  list or delete encrypted secrets."
)]
pub struct Cli {
    /// Base URL of the DataVault server used by client commands.
    #[arg(
        long,
        global = true,
        env = "SERVER_ADDRESS",
        default_value = "http://127.0.0.1:8080"
    )]
    pub server: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the DataVault gateway server.
    Serve(ServeArgs),

    /// Print a fresh ENCRYPTION_KEY and JWT_SECRET.
    Keygen,

    /// Create an account and save its token.
    Register(CredentialArgs),

    /// Log in and save the issued token.
    Login(CredentialArgs),

    /// Forget the locally saved token.
    Logout,

    /// Encrypt and store a secret.
    Put(PutArgs),

    /// List your stored secrets.
    List,

    /// Delete a secret by id.
    Delete {
        /// Identifier printed by `put` or `list`.
        id: String,
    },

    /// Check that the server and its database are reachable.
    Ping,
}

/// Flags for `serve`. Each one overrides the config file and environment.
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Path to a TOML config file (default: config/default.toml if present).
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Address to bind the HTTP server to.
    #[arg(long)]
    pub bind: Option<String>,

    /// Port to listen on.
    #[arg(long, short)]
    pub port: Option<u16>,

    /// SQLite database path.
    #[arg(long)]
    pub database: Option<PathBuf>,
}

#[derive(Args)]
pub struct CredentialArgs {
    /// Account login.
    pub login: String,

    /// Account password.
    #[arg(long, short, env = "DATAVAULT_PASSWORD", hide_env_values = true)]
    pub password: String,
}

/// Kind of secret accepted by `put`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    #[default]
    Text,
    Password,
    Binary,
    Card,
}

impl KindArg {
    /// Wire name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Password => "password",
            Self::Binary => "binary",
            Self::Card => "card",
        }
    }
}

/// Flags for `put`. Which ones are required depends on `--kind`.
#[derive(Args, Debug, Default)]
pub struct PutArgs {
    /// What the secret is.
    #[arg(long, short, value_enum)]
    pub kind: KindArg,

    /// Free-form notes stored alongside the secret.
    #[arg(long)]
    pub notes: Option<String>,

    // ── text ──
    /// Text content (kind = text).
    #[arg(long)]
    pub text: Option<String>,

    // ── binary ──
    /// File to upload (kind = binary).
    #[arg(long)]
    pub file: Option<PathBuf>,

    // ── password ──
    /// Site or service the credentials belong to (kind = password).
    #[arg(long)]
    pub website: Option<String>,

    /// Login on that site (kind = password).
    #[arg(long = "site-login")]
    pub site_login: Option<String>,

    /// Password on that site (kind = password).
    #[arg(long = "site-password")]
    pub site_password: Option<String>,

    // ── card ──
    /// Issuing bank (kind = card).
    #[arg(long)]
    pub bank: Option<String>,

    /// Card number (kind = card).
    #[arg(long)]
    pub number: Option<String>,

    /// Cardholder name (kind = card).
    #[arg(long)]
    pub holder: Option<String>,

    /// Card verification code (kind = card).
    #[arg(long)]
    pub cvv: Option<String>,

    /// Expiry month, 1-12 (kind = card).
    #[arg(long)]
    pub exp_month: Option<u32>,

    /// Expiry year (kind = card).
    #[arg(long)]
    pub exp_year: Option<u32>,
}
