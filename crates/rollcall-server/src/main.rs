//! rollcall server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the attendance API over HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `instructor_password_hash`:
//!
//! ```
//! cargo run -p rollcall-server -- --hash-password
//! ```

mod config;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use axum::Router;
use chrono::Utc;
use clap::Parser;
use rand_core::OsRng;
use rollcall_api::{AppState, AuthConfig};
use rollcall_core::gate::AccessGate;
use rollcall_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "rollcall attendance server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  let server_cfg = ServerConfig::load(&cli.config).context("failed to load configuration")?;

  let store_path = server_cfg.resolved_store_path();
  if let Some(parent) = store_path.parent() {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  if server_cfg.event_retention_days > 0 {
    let cutoff =
      Utc::now() - chrono::Duration::days(i64::from(server_cfg.event_retention_days));
    let pruned = store
      .prune_applied_events(cutoff)
      .await
      .context("failed to prune applied events")?;
    tracing::info!(pruned, %cutoff, "pruned idempotency keys");
  }

  let gate = AccessGate::new(server_cfg.approved_domain.clone());
  tracing::info!(domain = gate.domain(), "accounts restricted to approved domain");

  let state = AppState {
    store: Arc::new(store),
    gate:  Arc::new(gate),
    auth:  Arc::new(AuthConfig {
      username:      server_cfg.instructor_username.clone(),
      password_hash: server_cfg.instructor_password_hash.clone(),
    }),
  };

  let app = Router::new()
    .nest("/api", rollcall_api::api_router(state))
    .layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}
