//! salewin-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! catalog store and either serves the JSON API over HTTP or runs one
//! reconciliation sweep and exits.
//!
//! ```text
//! salewin-server --config config.toml serve
//! salewin-server --config config.toml reconcile
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use chrono::Utc;
use clap::{Parser, Subcommand};
use salewin_core::SaleEngine;
use salewin_server::ServerConfig;
use salewin_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Sale-window engine server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the JSON API (the default).
  Serve,
  /// Re-derive the whole catalog, correct drifted state and print a summary.
  Reconcile,
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

  let server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  let store_path = server_cfg.resolved_store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let engine = Arc::new(SaleEngine::new(Arc::new(store), server_cfg.engine.clone()));

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(engine, &server_cfg).await,
    Command::Reconcile => {
      let summary = engine.reconcile(Utc::now()).await.context("reconcile failed")?;
      println!("{}", serde_json::to_string_pretty(&summary)?);
      Ok(())
    }
  }
}

async fn serve(engine: Arc<SaleEngine<SqliteStore>>, cfg: &ServerConfig) -> anyhow::Result<()> {
  let app = salewin_server::app(engine);
  let address = format!("{}:{}", cfg.host, cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
