//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use hrms_shared::constants::{DEFAULT_HTTP_PORT, MAX_SEARCH_RESULTS};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// JSON page catalog replacing the built-in one.
    /// Env: `CATALOG_PATH`
    /// Default: unset (built-in catalog).
    pub catalog_path: Option<PathBuf>,

    /// Human-readable name for this server instance.
    /// Env: `INSTANCE_NAME`
    /// Default: `"HRMS Search"`
    pub instance_name: String,

    /// Maximum number of results per query.
    /// Env: `SEARCH_LIMIT`
    /// Default: `8`
    pub search_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            catalog_path: None,
            instance_name: "HRMS Search".to_string(),
            search_limit: MAX_SEARCH_RESULTS,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(
                    value = %addr,
                    "Invalid HTTP_ADDR, using default"
                );
            }
        }

        if let Ok(path) = std::env::var("CATALOG_PATH") {
            if !path.is_empty() {
                config.catalog_path = Some(PathBuf::from(path));
            }
        }

        if let Ok(name) = std::env::var("INSTANCE_NAME") {
            config.instance_name = name;
        }

        if let Ok(val) = std::env::var("SEARCH_LIMIT") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.search_limit = n,
                _ => tracing::warn!(value = %val, "Invalid SEARCH_LIMIT, using default"),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }
}
