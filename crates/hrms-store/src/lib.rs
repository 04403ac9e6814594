//! # hrms-store
//!
//! Client-local SQLite storage for the HRMS chat client.
//!
//! Nothing stored here is authoritative: it is a cache of UI hints (which
//! conversations currently have a live meeting) that the client prunes and
//! rewrites on every read. The crate exposes a synchronous `Database` handle
//! that wraps a `rusqlite::Connection` with typed helpers.

pub mod database;
pub mod meetings;
pub mod migrations;
pub mod models;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
