//! Client configuration loaded from environment variables.
//!
//! Endpoints default to a local development backend; the bearer token and
//! the local user id have no sensible default and are checked by
//! [`ClientConfig::validate`].

use std::path::PathBuf;
use std::time::Duration;

use hrms_shared::constants::DEFAULT_RECONNECT_SECS;
use hrms_shared::types::UserId;

use crate::error::ClientError;
use crate::optimistic::ReadPolicyKind;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST API.
    /// Env: `HRMS_API_URL`
    /// Default: `http://localhost:4000/api`
    pub api_url: String,

    /// WebSocket endpoint of the push channel.
    /// Env: `HRMS_SOCKET_URL`
    /// Default: `ws://localhost:4000/ws`
    pub socket_url: String,

    /// Bearer token sent with every request and once at socket connect.
    /// Env: `HRMS_TOKEN`
    pub token: String,

    /// Identity of the signed-in user.
    /// Env: `HRMS_USER_ID`
    pub user_id: Option<UserId>,

    /// Organization whose employee directory is loaded.
    /// Env: `HRMS_ORG_ID`
    pub organization_id: Option<String>,

    /// Location of the local badge cache. Platform data dir when unset.
    /// Env: `HRMS_DB_PATH`
    pub db_path: Option<PathBuf>,

    /// What to do when a read acknowledgement fails.
    /// Env: `HRMS_READ_POLICY` (`fire-and-forget` | `rollback`)
    pub read_policy: ReadPolicyKind,

    /// Delay before reconnecting the push channel.
    /// Env: `HRMS_RECONNECT_SECS`
    pub reconnect_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:4000/api".to_string(),
            socket_url: "ws://localhost:4000/ws".to_string(),
            token: String::new(),
            user_id: None,
            organization_id: None,
            db_path: None,
            read_policy: ReadPolicyKind::default(),
            reconnect_delay: Duration::from_secs(DEFAULT_RECONNECT_SECS),
        }
    }
}

impl ClientConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("HRMS_API_URL") {
            config.api_url = url;
        }

        if let Some(url) = non_empty("HRMS_SOCKET_URL") {
            config.socket_url = url;
        }

        if let Some(token) = non_empty("HRMS_TOKEN") {
            config.token = token;
        }

        config.user_id = non_empty("HRMS_USER_ID").map(UserId);
        config.organization_id = non_empty("HRMS_ORG_ID");
        config.db_path = non_empty("HRMS_DB_PATH").map(PathBuf::from);

        if let Some(value) = non_empty("HRMS_READ_POLICY") {
            match value.parse() {
                Ok(policy) => config.read_policy = policy,
                Err(e) => tracing::warn!(error = %e, "Invalid HRMS_READ_POLICY, using default"),
            }
        }

        if let Some(value) = non_empty("HRMS_RECONNECT_SECS") {
            match value.parse::<u64>() {
                Ok(secs) => config.reconnect_delay = Duration::from_secs(secs),
                Err(_) => tracing::warn!(value = %value, "Invalid HRMS_RECONNECT_SECS, using default"),
            }
        }

        config
    }

    /// Check that everything needed to open a session is present.
    pub fn validate(&self) -> Result<&UserId, ClientError> {
        if self.token.is_empty() {
            return Err(ClientError::Config("HRMS_TOKEN is not set".into()));
        }
        self.user_id
            .as_ref()
            .ok_or_else(|| ClientError::Config("HRMS_USER_ID is not set".into()))
    }
}
