//! Types and wire formats shared by the HRMS search server and chat client.

pub mod constants;
pub mod error;
pub mod models;
pub mod normalize;
pub mod protocol;
pub mod types;

pub use error::DropReason;
pub use normalize::Ingest;
