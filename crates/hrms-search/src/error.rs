use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading a catalog file at startup.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Catalog entry {index} for {role} has an empty {field}")]
    EmptyField {
        role: &'static str,
        index: usize,
        field: &'static str,
    },
}
