//! Read-only view of the chat state handed to the UI layer.
//!
//! Everything derived (summary counts, display names, search filtering) is
//! computed from the snapshot on demand and never stored.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use hrms_shared::constants::{DIRECT_CHAT_FALLBACK, GROUP_CHAT_FALLBACK};
use hrms_shared::models::{Conversation, Participant};
use hrms_shared::types::{ConversationKind, UserId};

use crate::directory::Directory;
use crate::state::Phase;

/// Header counters shown above the conversation list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub unread: u64,
    pub online: usize,
}

#[derive(Debug, Clone)]
pub struct ChatSnapshot {
    pub phase: Phase,
    pub local_user: UserId,
    pub conversations: Vec<Conversation>,
    pub online: HashSet<UserId>,
    pub directory: Arc<Directory>,
}

impl ChatSnapshot {
    pub fn empty(local_user: UserId) -> Self {
        Self {
            phase: Phase::Uninitialized,
            local_user,
            conversations: Vec::new(),
            online: HashSet::new(),
            directory: Arc::new(Directory::default()),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading)
    }

    pub fn summary(&self) -> Summary {
        Summary {
            total: self.conversations.len(),
            unread: self
                .conversations
                .iter()
                .map(|c| u64::from(c.unread_count))
                .sum(),
            online: self.online.len(),
        }
    }

    pub fn display_name(&self, conv: &Conversation) -> String {
        display_name(conv, &self.local_user, &self.directory)
    }

    /// Conversations whose display name or last message text contains
    /// `search`, case-insensitively. An empty search matches everything.
    pub fn filtered(&self, search: &str) -> Vec<&Conversation> {
        let needle = search.trim().to_lowercase();
        if needle.is_empty() {
            return self.conversations.iter().collect();
        }

        self.conversations
            .iter()
            .filter(|conv| {
                self.display_name(conv).to_lowercase().contains(&needle)
                    || conv
                        .last_message
                        .as_ref()
                        .is_some_and(|m| m.text.to_lowercase().contains(&needle))
            })
            .collect()
    }

    pub fn is_online(&self, user: &UserId) -> bool {
        self.online.contains(user)
    }

    /// Avatar of the peer in a direct conversation, preferring the payload
    /// over the directory.
    pub fn avatar_url<'a>(&'a self, conv: &'a Conversation) -> Option<&'a str> {
        if conv.kind != ConversationKind::Direct {
            return None;
        }
        let peer = peer(conv, &self.local_user)?;
        peer.avatar_url
            .as_deref()
            .or_else(|| self.directory.avatar_url(&peer.user_id))
    }
}

/// The other participant of a direct conversation, or the first participant
/// when no other one can be identified.
pub fn peer<'a>(conv: &'a Conversation, local_user: &UserId) -> Option<&'a Participant> {
    conv.participants
        .iter()
        .find(|p| &p.user_id != local_user)
        .or_else(|| conv.participants.first())
}

/// Resolve the label shown for a conversation.
pub fn display_name(conv: &Conversation, local_user: &UserId, directory: &Directory) -> String {
    match conv.kind {
        ConversationKind::Group => conv
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(GROUP_CHAT_FALLBACK)
            .to_string(),
        ConversationKind::Direct => peer(conv, local_user)
            .and_then(|p| {
                let name = p.full_name();
                if name.is_empty() {
                    directory.full_name(&p.user_id)
                } else {
                    Some(name)
                }
            })
            .unwrap_or_else(|| DIRECT_CHAT_FALLBACK.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use hrms_shared::models::{Employee, MessageSnapshot};

    use super::*;
    use crate::conversations::tests::{conv, t};

    fn person(id: &str, first: Option<&str>, last: Option<&str>) -> Participant {
        Participant {
            user_id: UserId::new(id),
            first_name: first.map(str::to_string),
            last_name: last.map(str::to_string),
            avatar_url: None,
        }
    }

    fn direct(id: &str, participants: Vec<Participant>) -> Conversation {
        let mut c = conv(id, Some(1), 0);
        c.participants = participants;
        c
    }

    fn group(id: &str, title: Option<&str>) -> Conversation {
        let mut c = conv(id, Some(1), 0);
        c.kind = ConversationKind::Group;
        c.title = title.map(str::to_string);
        c
    }

    fn snapshot(conversations: Vec<Conversation>) -> ChatSnapshot {
        ChatSnapshot {
            conversations,
            ..ChatSnapshot::empty(UserId::new("me"))
        }
    }

    #[test]
    fn group_names_fall_back() {
        let snap = snapshot(vec![]);
        assert_eq!(snap.display_name(&group("g", Some("HR Team"))), "HR Team");
        assert_eq!(snap.display_name(&group("g", Some("  "))), "Group Chat");
        assert_eq!(snap.display_name(&group("g", None)), "Group Chat");
    }

    #[test]
    fn direct_name_uses_the_other_participant() {
        let snap = snapshot(vec![]);
        let c = direct(
            "d",
            vec![person("me", Some("Self"), None), person("u2", Some("Ravi"), Some("K"))],
        );
        assert_eq!(snap.display_name(&c), "Ravi K");
    }

    #[test]
    fn direct_name_falls_back_to_first_participant_then_placeholder() {
        let snap = snapshot(vec![]);
        let alone = direct("d", vec![person("me", Some("Only"), Some("Me"))]);
        assert_eq!(snap.display_name(&alone), "Only Me");

        let nameless = direct("d", vec![person("me", None, None), person("u2", None, None)]);
        assert_eq!(snap.display_name(&nameless), "Direct Chat");

        assert_eq!(snap.display_name(&direct("d", vec![])), "Direct Chat");
    }

    #[test]
    fn directory_fills_missing_names_and_avatars() {
        let mut snap = snapshot(vec![]);
        snap.directory = Arc::new(Directory::new(vec![Employee {
            user_id: UserId::new("u2"),
            first_name: Some("Noor".into()),
            last_name: Some("Ali".into()),
            avatar_url: Some("/a/u2.png".into()),
        }]));

        let c = direct("d", vec![person("me", None, None), person("u2", None, None)]);
        assert_eq!(snap.display_name(&c), "Noor Ali");
        assert_eq!(snap.avatar_url(&c), Some("/a/u2.png"));
    }

    #[test]
    fn filter_matches_name_or_last_message() {
        let mut with_msg = group("g1", Some("Finance"));
        with_msg.last_message = Some(MessageSnapshot {
            id: None,
            sender_id: UserId::new("u9"),
            text: "Payslips are ready".into(),
            created_at: t(1),
            attachments: vec![],
        });
        let snap = snapshot(vec![
            with_msg,
            group("g2", Some("Ops")),
            direct("d1", vec![person("u2", Some("Priya"), None)]),
        ]);

        let ids = |hits: Vec<&Conversation>| hits.iter().map(|c| c.id.0.clone()).collect::<Vec<_>>();
        assert_eq!(ids(snap.filtered("")), vec!["g1", "g2", "d1"]);
        assert_eq!(ids(snap.filtered("PAYSLIP")), vec!["g1"]);
        assert_eq!(ids(snap.filtered("priya")), vec!["d1"]);
        assert_eq!(ids(snap.filtered("group chat")), Vec::<String>::new());
    }

    #[test]
    fn summary_is_derived() {
        let mut snap = snapshot(vec![conv("a", Some(1), 3), conv("b", Some(2), 4)]);
        snap.online.insert(UserId::new("u1"));
        assert_eq!(
            snap.summary(),
            Summary {
                total: 2,
                unread: 7,
                online: 1
            }
        );
    }
}
