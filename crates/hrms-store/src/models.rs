//! Records persisted in the local database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hrms_shared::types::ConversationId;

/// A conversation with a meeting in progress, shown as a "live" badge until
/// `expires_at` passes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveMeeting {
    pub conversation_id: ConversationId,
    pub expires_at: DateTime<Utc>,
}
