//! HTTP server assembly for Tenure.
//!
//! Mounts the JSON API under `/api` next to a `/health` probe, and carries
//! the server configuration and designation-catalog seeding used by the
//! `server` binary.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use axum::{Router, routing::get};
use serde::Deserialize;
use tenure_core::{Error, designation::DesignationEntry, store::ChainStore};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, layered from `config.toml` and `TENURE_*`
/// environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:            String,
  pub port:            u16,
  pub store_path:      PathBuf,
  /// How long a writer waits for a locked employee chain.
  pub lock_timeout_ms: u64,
}

impl ServerConfig {
  /// Load from `path` (optional) and the environment, over built-in
  /// defaults.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .set_default("host", "127.0.0.1")?
      .set_default("port", 8080)?
      .set_default("store_path", "~/.local/share/tenure/tenure.db")?
      .set_default("lock_timeout_ms", 5000)?
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("TENURE").try_parsing(true))
      .build()?
      .try_deserialize()
  }

  pub fn lock_timeout(&self) -> Duration { Duration::from_millis(self.lock_timeout_ms) }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Catalog seeding ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CatalogFile {
  designations: Vec<DesignationEntry>,
}

/// Read a designation list from a TOML file of `[[designations]]` tables.
pub fn load_catalog(path: &Path) -> Result<Vec<DesignationEntry>, config::ConfigError> {
  let file: CatalogFile = config::Config::builder()
    .add_source(config::File::from(path).format(config::FileFormat::Toml))
    .build()?
    .try_deserialize()?;
  Ok(file.designations)
}

/// Add every entry not already in the catalog. Returns how many were added.
pub async fn seed_catalog<S: ChainStore>(
  store: &S,
  entries: Vec<DesignationEntry>,
) -> tenure_core::Result<usize> {
  let mut added = 0;
  for entry in entries {
    let code = entry.code.clone();
    match store.add_designation(entry).await {
      Ok(_) => added += 1,
      Err(Error::Duplicate(_)) => debug!(%code, "designation already present"),
      Err(e) => return Err(e),
    }
  }
  info!(added, "seeded designation catalog");
  Ok(added)
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the top-level axum [`Router`]: `/health` plus the API under `/api`,
/// with request tracing.
pub fn router<S>(store: Arc<S>) -> Router
where
  S: ChainStore + 'static,
{
  Router::new()
    .route("/health", get(health))
    .nest("/api", tenure_api::api_router(store))
    .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str { "ok" }

// ─── Integration tests ────────────────────────────────────────────────────────
