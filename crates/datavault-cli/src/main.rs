//! CLI entry point for DataVault.
//!
//! This binary provides the `datavault` command: `serve` runs the gateway,
//! `keygen` prints fresh keys, and the remaining subcommands are a client
//! for a running server.

mod cli;
mod client;
mod config;
mod helpers;
mod kinds;
mod session;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use datavault_service::{SqliteStorage, VaultService};
use datavault_store::Database;
use datavault_vault::{Cipher, TokenService};
use datavault_web::WebServer;

use crate::cli::{Cli, Commands, CredentialArgs, PutArgs, ServeArgs};
use crate::client::ApiClient;
use crate::config::ServerConfig;
use crate::helpers::{generate_keys, init_tracing};
use crate::session::{SavedSession, SessionFile};

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => cmd_serve(args).await,
        Commands::Keygen => cmd_keygen(),
        Commands::Register(args) => cmd_register(&cli.server, args).await,
        Commands::Login(args) => cmd_login(&cli.server, args).await,
        Commands::Logout => cmd_logout(),
        Commands::Put(args) => cmd_put(&cli.server, args).await,
        Commands::List => cmd_list(&cli.server).await,
        Commands::Delete { id } => cmd_delete(&cli.server, &id).await,
        Commands::Ping => cmd_ping(&cli.server).await,
    }
}

// ---------------------------------------------------------------------------
// Subcommand: serve
// ---------------------------------------------------------------------------

async fn cmd_serve(args: ServeArgs) -> Result<()> {
    init_tracing("info");

    let config = ServerConfig::load(&args).context("invalid configuration")?;
    info!(?config, "configuration loaded");

    if let Some(dir) = config.database.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let db = Database::open_and_migrate(config.database.clone())
        .await
        .context("failed to open database")?;
    info!(path = %config.database.display(), "store initialized");

    let cipher = Cipher::new(&config.encryption_key).context("invalid ENCRYPTION_KEY")?;
    let tokens = TokenService::new(&config.signing_key, config.token_ttl)
        .context("invalid token settings")?;
    info!(
        aes_bits = cipher.key_bits(),
        token_ttl_hours = tokens.ttl().num_hours(),
        "crypto initialized"
    );

    let service = Arc::new(VaultService::new(
        Arc::new(SqliteStorage::new(db)),
        cipher,
        Arc::new(tokens),
    ));

    WebServer::new(config.web_config(), service)
        .start()
        .await
        .context("web server failed")
}

// ---------------------------------------------------------------------------
// Subcommand: keygen
// ---------------------------------------------------------------------------

fn cmd_keygen() -> Result<()> {
    let (encryption_key, signing_key) = generate_keys()?;
    println!("ENCRYPTION_KEY={encryption_key}");
    println!("JWT_SECRET={signing_key}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommands: register / login / logout
// ---------------------------------------------------------------------------

async fn cmd_register(server: &str, args: CredentialArgs) -> Result<()> {
    init_tracing("warn");
    let issued = ApiClient::new(server)?
        .register(&args.login, &args.password)
        .await
        .context("registration failed")?;
    save_session(&args.login, issued.token)?;
    println!("Registered as {}. Token valid until {}.", args.login, issued.expires_at);
    Ok(())
}

async fn cmd_login(server: &str, args: CredentialArgs) -> Result<()> {
    init_tracing("warn");
    let issued = ApiClient::new(server)?
        .login(&args.login, &args.password)
        .await
        .context("login failed")?;
    save_session(&args.login, issued.token)?;
    println!("Logged in as {}. Token valid until {}.", args.login, issued.expires_at);
    Ok(())
}

fn save_session(login: &str, token: String) -> Result<()> {
    let file = SessionFile::in_home()?;
    file.save(&SavedSession {
        token,
        login: login.to_owned(),
    })
}

fn cmd_logout() -> Result<()> {
    if SessionFile::in_home()?.clear()? {
        println!("Logged out.");
    } else {
        println!("No saved session.");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommands: put / list / delete / ping
// ---------------------------------------------------------------------------

async fn cmd_put(server: &str, args: PutArgs) -> Result<()> {
    init_tracing("warn");
    let session = SessionFile::in_home()?.require()?;
    let payload = kinds::build_payload(&args)?;

    let stored = ApiClient::new(server)?
        .store(&session.token, args.kind.as_str(), &payload)
        .await
        .context("failed to store secret")?;
    println!("Stored {} secret {} at {}.", args.kind.as_str(), stored.id, stored.created_at);
    Ok(())
}

async fn cmd_list(server: &str) -> Result<()> {
    init_tracing("warn");
    let session = SessionFile::in_home()?.require()?;
    let secrets = ApiClient::new(server)?
        .list(&session.token)
        .await
        .context("failed to list secrets")?;

    if secrets.is_empty() {
        println!("No secrets stored.");
        return Ok(());
    }

    println!("Secrets of {}:", session.login);
    for (i, secret) in secrets.iter().enumerate() {
        let data = kinds::decode_data(&secret.data)?;
        println!(
            "{:>3}. {}  [{}] {}  {}",
            i + 1,
            secret.id,
            secret.kind,
            secret.created_at.format("%Y-%m-%d %H:%M:%S"),
            kinds::describe(&secret.kind, &data)
        );
    }
    Ok(())
}

async fn cmd_delete(server: &str, id: &str) -> Result<()> {
    init_tracing("warn");
    let session = SessionFile::in_home()?.require()?;
    ApiClient::new(server)?
        .delete(&session.token, id)
        .await
        .context("failed to delete secret")?;
    println!("Deleted {id}.");
    Ok(())
}

async fn cmd_ping(server: &str) -> Result<()> {
    init_tracing("warn");
    let session = SessionFile::in_home()?.require()?;
    ApiClient::new(server)?
        .ping(&session.token)
        .await
        .context("ping failed")?;
    println!("Server at {server} and its database are reachable.");
    Ok(())
}
