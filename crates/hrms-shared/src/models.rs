//! Domain models for the chat side of the HRMS.
//!
//! These are the validated shapes produced by [`crate::normalize`]; nothing
//! outside that module builds them from raw JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ConversationId, ConversationKind, MessageId, UserId};

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

/// A member of a conversation, as embedded in the conversation payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: UserId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl Participant {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            first_name: None,
            last_name: None,
            avatar_url: None,
        }
    }

    /// "First Last", skipping blank parts. Empty when no part is present.
    pub fn full_name(&self) -> String {
        join_name(self.first_name.as_deref(), self.last_name.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Message snapshot
// ---------------------------------------------------------------------------

/// The latest message of a conversation, or the payload of a push event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageSnapshot {
    pub id: Option<MessageId>,
    pub sender_id: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub attachments: Vec<String>,
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// A direct or group messaging thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub kind: ConversationKind,
    /// Display name, only meaningful for groups.
    pub title: Option<String>,
    /// Unique by `user_id`; payload order preserved.
    pub participants: Vec<Participant>,
    pub last_message: Option<MessageSnapshot>,
    pub unread_count: u32,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Conversation {
    /// Timestamp used for ordering: `updated_at`, else the last message time.
    pub fn effective_timestamp(&self) -> Option<DateTime<Utc>> {
        self.updated_at
            .or_else(|| self.last_message.as_ref().map(|m| m.created_at))
    }
}

// ---------------------------------------------------------------------------
// Employee
// ---------------------------------------------------------------------------

/// Directory entry used to resolve names and avatars of chat peers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub user_id: UserId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        join_name(self.first_name.as_deref(), self.last_name.as_deref())
    }
}

fn join_name(first: Option<&str>, last: Option<&str>) -> String {
    [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
