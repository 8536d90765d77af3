//! vellum-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the document API over HTTP.
//!
//! ```toml
//! host         = "0.0.0.0"
//! port         = 8080
//! store_path   = "~/.local/share/vellum/vellum.db"
//! template_dir = "./templates"
//!
//! [engine]
//! notify_timeout_ms       = 2000
//! min_cancellation_reason = 10
//! ```
//!
//! Any key can be overridden from the environment, e.g. `VELLUM_PORT=9000`
//! or `VELLUM_ENGINE__NOTIFY_TIMEOUT_MS=500`.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use vellum_engine::{BroadcastNotifier, Engine};
use vellum_server::{DirectoryTemplates, ServerConfig};
use vellum_store_sqlite::SqliteStore;

#[derive(Parser)]
#[command(author, version, about = "Vellum document server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("VELLUM")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in paths.
  let store_path = expand_tilde(&server_cfg.store_path);
  let template_dir = expand_tilde(&server_cfg.template_dir);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let events = BroadcastNotifier::new(server_cfg.event_buffer);
  let engine = Engine::new(
    Arc::new(store),
    Arc::new(DirectoryTemplates::new(template_dir)),
    Arc::new(events.clone()),
  )
  .with_config(server_cfg.engine.clone());

  let app = vellum_server::router(engine, events);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
