//! Optimistic mark-read handling.
//!
//! Marking a conversation read zeroes its counter locally right away and then
//! sends a best-effort acknowledgement to the backend. What happens when that
//! acknowledgement fails is the job of a [`ReadPolicy`]; call sites only ever
//! talk to the trait.

use std::str::FromStr;

use tracing::{debug, info};

use hrms_shared::types::{ConversationId, MessageId};

use crate::conversations::ConversationList;

/// Which conversations a mark-read request covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadTarget {
    One(ConversationId),
    All,
}

/// An acknowledgement to send, with what is needed to undo it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadReceipt {
    pub conversation_id: ConversationId,
    /// Latest message at the time of marking, if known.
    pub message_id: Option<MessageId>,
    pub previous_unread: u32,
}

pub trait ReadPolicy: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Apply the local update and return one receipt per conversation that
    /// must be acknowledged.
    ///
    /// A single target is acknowledged even when its counter was already
    /// zero; a mark-all only acknowledges conversations it changed.
    fn apply(&self, conversations: &mut ConversationList, target: &ReadTarget) -> Vec<ReadReceipt> {
        let marked = match target {
            ReadTarget::One(id) => conversations
                .mark_read(id)
                .map(|prev| vec![(id.clone(), prev)])
                .unwrap_or_default(),
            ReadTarget::All => conversations.mark_all_read(),
        };

        marked
            .into_iter()
            .map(|(conversation_id, previous_unread)| ReadReceipt {
                message_id: conversations
                    .get(&conversation_id)
                    .and_then(|c| c.last_message.as_ref())
                    .and_then(|m| m.id.clone()),
                conversation_id,
                previous_unread,
            })
            .collect()
    }

    /// React to a failed acknowledgement.
    fn on_failure(&self, conversations: &mut ConversationList, receipt: &ReadReceipt);
}

/// Keep the optimistic state no matter what the backend says.
#[derive(Debug, Clone, Copy, Default)]
pub struct FireAndForget;

impl ReadPolicy for FireAndForget {
    fn name(&self) -> &'static str {
        "fire-and-forget"
    }

    fn on_failure(&self, _conversations: &mut ConversationList, receipt: &ReadReceipt) {
        debug!(
            conversation = %receipt.conversation_id,
            "Read acknowledgement failed; keeping local state"
        );
    }
}

/// Restore the previous counter when the acknowledgement fails, unless the
/// conversation moved on in the meantime.
#[derive(Debug, Clone, Copy, Default)]
pub struct RollbackOnFailure;

impl ReadPolicy for RollbackOnFailure {
    fn name(&self) -> &'static str {
        "rollback"
    }

    fn on_failure(&self, conversations: &mut ConversationList, receipt: &ReadReceipt) {
        let Some(conv) = conversations.get_mut(&receipt.conversation_id) else {
            return;
        };

        let current_message = conv.last_message.as_ref().and_then(|m| m.id.as_ref());
        if conv.unread_count == 0 && current_message == receipt.message_id.as_ref() {
            conv.unread_count = receipt.previous_unread;
            info!(
                conversation = %receipt.conversation_id,
                restored = receipt.previous_unread,
                "Rolled back optimistic mark-read"
            );
        }
    }
}

/// Configurable policy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadPolicyKind {
    #[default]
    FireAndForget,
    Rollback,
}

impl ReadPolicyKind {
    pub fn build(self) -> Box<dyn ReadPolicy> {
        match self {
            Self::FireAndForget => Box::new(FireAndForget),
            Self::Rollback => Box::new(RollbackOnFailure),
        }
    }
}

impl FromStr for ReadPolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fire-and-forget" | "optimistic" => Ok(Self::FireAndForget),
            "rollback" => Ok(Self::Rollback),
            other => Err(format!("unknown read policy: {other}")),
        }
    }
}
