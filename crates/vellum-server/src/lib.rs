//! HTTP server wiring for Vellum.
//!
//! Holds the on-disk configuration, a filesystem [`TemplateSource`], and the
//! top-level router the `vellum-server` binary serves.

pub mod templates;

use std::path::PathBuf;

use axum::{Router, routing::get};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use vellum_core::{
  notify::ChangeNotifier, store::DocumentStore, template::TemplateSource,
};
use vellum_engine::{BroadcastNotifier, Engine, EngineConfig};

pub use templates::DirectoryTemplates;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `VELLUM_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:         String,
  #[serde(default = "default_port")]
  pub port:         u16,
  pub store_path:   PathBuf,
  /// Directory holding one file per template; the file name is the
  /// template reference.
  pub template_dir: PathBuf,
  /// Capacity of the change-notification channel behind `/events`.
  #[serde(default = "default_event_buffer")]
  pub event_buffer: usize,
  #[serde(default)]
  pub engine:       EngineConfig,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_event_buffer() -> usize { 256 }

// ─── Router ───────────────────────────────────────────────────────────────────

/// The full application: the document API under `/api`, a liveness probe,
/// and request tracing.
pub fn router<S, T, N>(engine: Engine<S, T, N>, events: BroadcastNotifier) -> Router
where
  S: DocumentStore + 'static,
  T: TemplateSource,
  N: ChangeNotifier,
{
  Router::new()
    .route("/health", get(|| async { "ok" }))
    .nest("/api", vellum_api::api_router(engine, events))
    .layer(TraceLayer::new_for_http())
}
