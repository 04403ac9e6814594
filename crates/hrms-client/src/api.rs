//! REST access to the HRMS backend.
//!
//! The backend is a black box: responses are untrusted JSON and every item
//! goes through [`hrms_shared::normalize`] before it reaches the chat state.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use hrms_shared::models::{Conversation, Employee};
use hrms_shared::normalize::{self, Batch};
use hrms_shared::types::{ConversationId, MessageId};

use crate::config::ClientConfig;
use crate::error::ClientError;

/// The authoritative pull source plus the acknowledgement sink.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Full conversation list of the local user.
    async fn fetch_conversations(&self) -> Result<Batch<Conversation>, ClientError>;

    /// Employees of an organization, for avatar and name resolution.
    async fn fetch_employees(&self, organization_id: &str) -> Result<Batch<Employee>, ClientError>;

    /// Tell the backend a conversation was read up to `message_id`.
    async fn acknowledge_read(
        &self,
        conversation_id: &ConversationId,
        message_id: Option<&MessageId>,
    ) -> Result<(), ClientError>;
}

/// [`ChatBackend`] over HTTP with bearer authentication.
#[derive(Debug, Clone)]
pub struct RestBackend {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl RestBackend {
    pub fn new(base_url: &str, token: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("hrms-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::new(&config.api_url, &config.token)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json(&self, path: &str) -> Result<Value, ClientError> {
        let url = self.url(path);
        let resp = self.http.get(&url).bearer_auth(&self.token).send().await?;

        if !resp.status().is_success() {
            return Err(ClientError::Status {
                status: resp.status().as_u16(),
                url,
            });
        }

        Ok(resp.json::<Value>().await?)
    }
}

#[async_trait]
impl ChatBackend for RestBackend {
    async fn fetch_conversations(&self) -> Result<Batch<Conversation>, ClientError> {
        let body = self.get_json("/chat/conversations").await?;
        let items = normalize::collection(body, &["data", "conversations"]);
        let batch = normalize::batch(&items, normalize::conversation);
        debug!(
            received = items.len(),
            kept = batch.items.len(),
            "Fetched conversations"
        );
        Ok(batch)
    }

    async fn fetch_employees(&self, organization_id: &str) -> Result<Batch<Employee>, ClientError> {
        let body = self
            .get_json(&format!("/organizations/{organization_id}/employees"))
            .await?;
        let items = normalize::collection(body, &["data", "employees"]);
        Ok(normalize::batch(&items, normalize::employee))
    }

    async fn acknowledge_read(
        &self,
        conversation_id: &ConversationId,
        message_id: Option<&MessageId>,
    ) -> Result<(), ClientError> {
        let url = self.url(&format!("/chat/conversations/{conversation_id}/read"));
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&json!({ "messageId": message_id.map(MessageId::as_str) }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ClientError::Status {
                status: resp.status().as_u16(),
                url,
            });
        }
        Ok(())
    }
}
