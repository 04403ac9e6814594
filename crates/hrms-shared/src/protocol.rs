use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{EVENT_MESSAGE, EVENT_PRESENCE};
use crate::error::DropReason;
use crate::models::MessageSnapshot;
use crate::normalize::{self, Ingest};
use crate::types::{ConversationId, PresenceStatus, UserId};

/// Server-initiated events delivered over the push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PushEvent {
    /// A user came online or went offline
    Presence(PresenceEvent),

    /// A new message was posted to a conversation
    Message(MessageEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEvent {
    pub user_id: UserId,
    pub status: PresenceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub conversation_id: ConversationId,
    pub message: MessageSnapshot,
}

/// Socket frame envelope: `{"event": "...", "data": {...}}`.
#[derive(Debug, Deserialize)]
struct Frame {
    event: String,
    #[serde(default)]
    data: Value,
}

impl PushEvent {
    /// Decode one text frame from the socket. Anything that does not yield a
    /// complete event is rejected with the reason.
    pub fn parse(frame: &str, received_at: DateTime<Utc>) -> Ingest<Self> {
        Self::parse_inner(frame, received_at).into()
    }

    fn parse_inner(frame: &str, received_at: DateTime<Utc>) -> Result<Self, DropReason> {
        let frame: Frame =
            serde_json::from_str(frame).map_err(|e| DropReason::Malformed(e.to_string()))?;
        let data = frame.data.as_object().ok_or(DropReason::NotAnObject)?;

        match frame.event.as_str() {
            EVENT_PRESENCE => {
                let user_id = normalize::identity(data, &["userId", "user_id"])
                    .ok_or(DropReason::MissingField("userId"))?;
                let status = data
                    .get("status")
                    .and_then(Value::as_str)
                    .ok_or(DropReason::MissingField("status"))?
                    .parse::<PresenceStatus>()
                    .map_err(|_| DropReason::InvalidField("status"))?;
                Ok(Self::Presence(PresenceEvent {
                    user_id: UserId(user_id),
                    status,
                }))
            }
            EVENT_MESSAGE => {
                let conversation_id =
                    normalize::identity(data, &["conversationId", "conversation_id"])
                        .ok_or(DropReason::MissingField("conversationId"))?;
                let message = data
                    .get("message")
                    .ok_or(DropReason::MissingField("message"))?;
                let message = normalize::message(message, received_at).into_result()?;
                Ok(Self::Message(MessageEvent {
                    conversation_id: ConversationId(conversation_id),
                    message,
                }))
            }
            other => Err(DropReason::UnknownEvent(other.to_string())),
        }
    }
}
