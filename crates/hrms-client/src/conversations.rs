//! The locally held conversation list.
//!
//! Invariants maintained by every mutation:
//! - entries are sorted by effective timestamp, newest first (stable; entries
//!   without any timestamp sort last);
//! - no two entries share an id;
//! - `unread_count` only goes down through [`ConversationList::mark_read`],
//!   [`ConversationList::mark_all_read`] or a wholesale replace.

use std::collections::HashMap;

use tracing::debug;

use hrms_shared::models::Conversation;
use hrms_shared::protocol::MessageEvent;
use hrms_shared::types::{ConversationId, UserId};

/// Result of applying a message event to the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Applied,
    /// The conversation is not held locally; only a reload can add it.
    UnknownConversation,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationList {
    items: Vec<Conversation>,
}

impl ConversationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole list with an authoritative result.
    pub fn replace_all(&mut self, items: Vec<Conversation>) {
        self.items = dedup(items);
        self.sort();
    }

    pub fn get(&self, id: &ConversationId) -> Option<&Conversation> {
        self.items.iter().find(|c| &c.id == id)
    }

    pub fn get_mut(&mut self, id: &ConversationId) -> Option<&mut Conversation> {
        self.items.iter_mut().find(|c| &c.id == id)
    }

    pub fn contains(&self, id: &ConversationId) -> bool {
        self.get(id).is_some()
    }

    pub fn as_slice(&self) -> &[Conversation] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &Conversation> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Patch the conversation's last message and bump its unread counter.
    ///
    /// A message sent by `local_user` resets the counter instead: the sender
    /// has necessarily read their own conversation.
    pub fn apply_message(&mut self, event: &MessageEvent, local_user: &UserId) -> MessageOutcome {
        let Some(pos) = self.items.iter().position(|c| c.id == event.conversation_id) else {
            return MessageOutcome::UnknownConversation;
        };

        let conv = &mut self.items[pos];
        conv.updated_at = Some(event.message.created_at);
        conv.last_message = Some(event.message.clone());
        if &event.message.sender_id == local_user {
            conv.unread_count = 0;
        } else {
            conv.unread_count = conv.unread_count.saturating_add(1);
        }

        debug!(
            conversation = %event.conversation_id,
            unread = conv.unread_count,
            "Applied message to conversation"
        );

        self.reposition(pos);
        MessageOutcome::Applied
    }

    /// Zero one conversation's counter, returning the previous value.
    pub fn mark_read(&mut self, id: &ConversationId) -> Option<u32> {
        self.get_mut(id)
            .map(|conv| std::mem::replace(&mut conv.unread_count, 0))
    }

    /// Zero every non-zero counter, returning the affected ids and their
    /// previous values.
    pub fn mark_all_read(&mut self) -> Vec<(ConversationId, u32)> {
        self.items
            .iter_mut()
            .filter(|c| c.unread_count > 0)
            .map(|c| (c.id.clone(), std::mem::replace(&mut c.unread_count, 0)))
            .collect()
    }

    pub fn is_sorted(&self) -> bool {
        self.items
            .windows(2)
            .all(|w| w[0].effective_timestamp() >= w[1].effective_timestamp())
    }

    fn sort(&mut self) {
        // `Option` orders `None` first, so reversing puts undated entries last.
        self.items
            .sort_by(|a, b| b.effective_timestamp().cmp(&a.effective_timestamp()));
    }

    // The updated entry usually becomes the newest one; move it to the front
    // without disturbing the rest, and fall back to a full sort otherwise.
    fn reposition(&mut self, pos: usize) {
        let ts = self.items[pos].effective_timestamp();
        let is_newest = self
            .items
            .iter()
            .enumerate()
            .all(|(i, c)| i == pos || c.effective_timestamp() <= ts);

        if is_newest {
            self.items[..=pos].rotate_right(1);
        } else {
            self.sort();
        }
    }
}

/// Keep one entry per id: the one with the newer effective timestamp, the
/// later occurrence on ties. First-seen order is preserved otherwise.
fn dedup(items: Vec<Conversation>) -> Vec<Conversation> {
    let mut index: HashMap<ConversationId, usize> = HashMap::with_capacity(items.len());
    let mut out: Vec<Conversation> = Vec::with_capacity(items.len());

    for conv in items {
        match index.get(&conv.id) {
            Some(&i) => {
                if conv.effective_timestamp() >= out[i].effective_timestamp() {
                    out[i] = conv;
                }
            }
            None => {
                index.insert(conv.id.clone(), out.len());
                out.push(conv);
            }
        }
    }
    out
}
