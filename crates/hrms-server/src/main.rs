//! # hrms-server
//!
//! HTTP front for the HRMS page search.
//!
//! This binary provides:
//! - **Role-scoped page search** over the built-in catalog or a JSON catalog
//!   file given by `CATALOG_PATH`
//! - **Health and instance info** endpoints for load balancers and operators

mod api;
mod config;
mod error;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use hrms_search::{Catalog, SearchEngine};

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::error::ServerError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,hrms_server=debug,hrms_search=debug")),
        )
        .init();

    info!("Starting HRMS search server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Build the search engine
    // -----------------------------------------------------------------------
    let engine = load_engine(&config)?;
    let http_addr = config.http_addr;

    let app_state = AppState {
        engine: Arc::new(engine),
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}

fn load_engine(config: &ServerConfig) -> Result<SearchEngine, ServerError> {
    let catalog = match &config.catalog_path {
        Some(path) => Catalog::from_path(path)?,
        None => Catalog::builtin(),
    };
    Ok(SearchEngine::new(catalog).with_limit(config.search_limit))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use hrms_shared::types::Role;

    use super::*;

    #[test]
    fn loads_catalog_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"admin": [{{"label": "Audit Log", "href": "/admin/audit", "keywords": ["history"]}}]}}"#
        )
        .unwrap();

        let config = ServerConfig {
            catalog_path: Some(file.path().to_path_buf()),
            ..ServerConfig::default()
        };
        let engine = load_engine(&config).unwrap();
        assert_eq!(engine.search("history", Role::Admin)[0].href, "/admin/audit");
        assert!(engine.search("history", Role::Employee).is_empty());
    }

    #[test]
    fn missing_catalog_file_is_an_error() {
        let config = ServerConfig {
            catalog_path: Some("/nonexistent/catalog.json".into()),
            ..ServerConfig::default()
        };
        assert!(matches!(load_engine(&config), Err(ServerError::Catalog(_))));
    }
}
