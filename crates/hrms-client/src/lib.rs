pub mod api;
pub mod config;
pub mod conversations;
pub mod directory;
pub mod error;
pub mod events;
pub mod meetings;
pub mod optimistic;
pub mod presence;
pub mod session;
pub mod socket;
pub mod state;
pub mod view;

use tracing_subscriber::{fmt, EnvFilter};

pub use error::ClientError;
pub use session::{ChatSession, SessionHandle, SessionOptions};

/// Install the global tracing subscriber, honouring `RUST_LOG`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hrms_client=debug,hrms_store=info,warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
