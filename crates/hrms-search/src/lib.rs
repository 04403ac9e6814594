//! # hrms-search
//!
//! Role-scoped navigation search: a static catalog of pages per role and a
//! pure ranking function over it.

pub mod catalog;
pub mod rank;

mod error;

pub use catalog::{Catalog, SearchTarget};
pub use error::CatalogError;
pub use rank::{rank, ScoringWeights, SearchEngine, SearchHit};
