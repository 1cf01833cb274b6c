//! Configuration and application assembly for the `salewin-server` binary.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use salewin_core::{EngineConfig, SaleEngine, store::CatalogStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `SALEWIN_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  pub store_path: PathBuf,
  #[serde(default)]
  pub engine:     EngineConfig,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

impl ServerConfig {
  /// Layer the optional TOML file at `path` under the environment.
  ///
  /// Nested keys use a double underscore, e.g.
  /// `SALEWIN_ENGINE__BADGE_MODE=off`.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("SALEWIN")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()?
      .try_deserialize()
  }

  /// The store path with a leading `~` expanded.
  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Application ──────────────────────────────────────────────────────────────

/// The API mounted under `/api`, with request tracing.
pub fn app<S>(engine: Arc<SaleEngine<S>>) -> Router
where
  S: CatalogStore + 'static,
{
  Router::new()
    .nest("/api", salewin_api::api_router(engine))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use axum::{body::Body, http::{Request, StatusCode}};
  use config::FileFormat;
  use salewin_core::{aggregate::AggregationPolicy, effects::BadgeMode};
  use salewin_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  fn parse(toml: &str) -> ServerConfig {
    config::Config::builder()
      .add_source(config::File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn minimal_config_uses_defaults() {
    let cfg = parse(r#"store_path = "catalog.db""#);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.engine, EngineConfig::default());
  }

  #[test]
  fn engine_table_overrides_policy() {
    let cfg = parse(
      r#"
        store_path = "catalog.db"
        port = 9000

        [engine]
        variant_policy = "least_restrictive"
        badge_mode = "manual_override"
        reconcile_chunk_size = 10
      "#,
    );
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.engine.variant_policy, AggregationPolicy::LeastRestrictive);
    assert_eq!(cfg.engine.badge_mode, BadgeMode::ManualOverride);
    assert_eq!(cfg.engine.reconcile_chunk_size, 10);
    assert!(cfg.engine.fold_visibility);
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else {
      return;
    };
    assert_eq!(expand_tilde(Path::new("~/catalog.db")), PathBuf::from(home).join("catalog.db"));
    assert_eq!(expand_tilde(Path::new("/tmp/catalog.db")), PathBuf::from("/tmp/catalog.db"));
  }

  #[tokio::test]
  async fn api_is_mounted_under_prefix() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let engine = Arc::new(SaleEngine::new(Arc::new(store), EngineConfig::default()));

    let req = Request::builder().uri("/api/templates").body(Body::empty()).unwrap();
    let resp = app(engine.clone()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let req = Request::builder().uri("/templates").body(Body::empty()).unwrap();
    let resp = app(engine).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
