//! Chat state machine.
//!
//! [`ChatStore`] owns every piece of chat state for one mounted view: the
//! conversation list, the presence set, the employee directory and the
//! message events buffered while a pull is in flight. It never performs I/O
//! itself; operations return [`Effect`]s that the session driver executes.
//!
//! Pull/push precedence: a pull replaces the list wholesale. Message events
//! arriving while a pull is in flight are buffered and replayed once it
//! lands, and a replayed event only applies if it is newer than what the
//! pull returned for that conversation. Presence events are applied
//! immediately in every phase.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use hrms_shared::models::{Conversation, Employee};
use hrms_shared::normalize::Batch;
use hrms_shared::protocol::{MessageEvent, PushEvent};
use hrms_shared::types::{ConversationId, UserId};

use crate::conversations::{ConversationList, MessageOutcome};
use crate::directory::Directory;
use crate::optimistic::{FireAndForget, ReadPolicy, ReadReceipt, ReadTarget};
use crate::presence::PresenceSet;
use crate::view::ChatSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Nothing fetched yet.
    Uninitialized,
    /// First pull in flight.
    Loading,
    /// Normal operation.
    Ready,
    /// A later pull is in flight; the current list stays visible.
    Refreshing,
    /// Torn down; further input is ignored.
    Closed,
}

/// Side effects requested by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Pull the full conversation list.
    Reload,
    /// Send a best-effort read acknowledgement.
    Acknowledge(ReadReceipt),
}

#[derive(Debug, Clone)]
struct PendingMessage {
    event: MessageEvent,
    /// Already caused a reload because its conversation was unknown.
    resynced: bool,
}

#[derive(Debug)]
pub struct ChatStore {
    local_user: UserId,
    phase: Phase,
    conversations: ConversationList,
    presence: PresenceSet,
    directory: Arc<Directory>,
    pending: Vec<PendingMessage>,
    policy: Box<dyn ReadPolicy>,
}

impl ChatStore {
    pub fn new(local_user: UserId) -> Self {
        Self::with_policy(local_user, Box::new(FireAndForget))
    }

    pub fn with_policy(local_user: UserId, policy: Box<dyn ReadPolicy>) -> Self {
        Self {
            local_user,
            phase: Phase::Uninitialized,
            conversations: ConversationList::new(),
            presence: PresenceSet::new(),
            directory: Arc::new(Directory::default()),
            pending: Vec::new(),
            policy,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn local_user(&self) -> &UserId {
        &self.local_user
    }

    pub fn conversations(&self) -> &ConversationList {
        &self.conversations
    }

    pub fn presence(&self) -> &PresenceSet {
        &self.presence
    }

    pub fn is_pulling(&self) -> bool {
        matches!(self.phase, Phase::Loading | Phase::Refreshing)
    }

    /// Ask for a full pull. Yields [`Effect::Reload`] unless one is already
    /// in flight (or the store is closed).
    pub fn request_reload(&mut self) -> Vec<Effect> {
        let next = match self.phase {
            Phase::Uninitialized => Phase::Loading,
            Phase::Ready => Phase::Refreshing,
            Phase::Loading | Phase::Refreshing | Phase::Closed => return Vec::new(),
        };
        debug!(from = ?self.phase, to = ?next, "Starting conversation pull");
        self.phase = next;
        vec![Effect::Reload]
    }

    /// Complete the in-flight pull.
    ///
    /// On success the list is replaced and buffered events are replayed. On
    /// failure the previous list stays, buffered events are applied against
    /// it, and no retry is scheduled.
    pub fn finish_pull(&mut self, result: Result<Batch<Conversation>, String>) -> Vec<Effect> {
        if !self.is_pulling() {
            debug!(phase = ?self.phase, "Ignoring pull result outside of a pull");
            return Vec::new();
        }
        self.phase = Phase::Ready;

        let pending = std::mem::take(&mut self.pending);
        match result {
            Ok(batch) => {
                if batch.dropped > 0 {
                    warn!(dropped = batch.dropped, "Dropped malformed conversations");
                }
                self.conversations.replace_all(batch.items);
                info!(
                    conversations = self.conversations.len(),
                    replayed = pending.len(),
                    "Conversation list loaded"
                );
                self.replay(pending)
            }
            Err(error) => {
                warn!(%error, "Conversation pull failed; keeping previous list");
                for PendingMessage { event, .. } in pending {
                    if self.conversations.apply_message(&event, &self.local_user)
                        == MessageOutcome::UnknownConversation
                    {
                        debug!(conversation = %event.conversation_id, "Dropping event for unknown conversation");
                    }
                }
                Vec::new()
            }
        }
    }

    fn replay(&mut self, pending: Vec<PendingMessage>) -> Vec<Effect> {
        let mut needs_reload = false;

        for mut item in pending {
            let Some(conv) = self.conversations.get(&item.event.conversation_id) else {
                if item.resynced {
                    warn!(
                        conversation = %item.event.conversation_id,
                        "Conversation still unknown after reload; dropping event"
                    );
                } else {
                    item.resynced = true;
                    self.pending.push(item);
                    needs_reload = true;
                }
                continue;
            };

            if is_newer_than(conv, &item.event) {
                self.conversations
                    .apply_message(&item.event, &self.local_user);
            } else {
                debug!(
                    conversation = %item.event.conversation_id,
                    "Pulled state already covers buffered event"
                );
            }
        }

        if needs_reload {
            self.request_reload()
        } else {
            Vec::new()
        }
    }

    /// Route one push event.
    pub fn on_push(&mut self, event: PushEvent) -> Vec<Effect> {
        if self.phase == Phase::Closed {
            return Vec::new();
        }
        match event {
            PushEvent::Presence(presence) => {
                self.presence.apply(&presence);
                Vec::new()
            }
            PushEvent::Message(message) => self.on_message(message),
        }
    }

    fn on_message(&mut self, event: MessageEvent) -> Vec<Effect> {
        if self.is_pulling() {
            self.pending.push(PendingMessage {
                event,
                resynced: false,
            });
            return Vec::new();
        }

        match self.conversations.apply_message(&event, &self.local_user) {
            MessageOutcome::Applied => Vec::new(),
            MessageOutcome::UnknownConversation => {
                info!(conversation = %event.conversation_id, "Message for unknown conversation; resyncing");
                self.pending.push(PendingMessage {
                    event,
                    resynced: true,
                });
                self.request_reload()
            }
        }
    }

    pub fn mark_read(&mut self, id: &ConversationId) -> Vec<Effect> {
        self.mark(ReadTarget::One(id.clone()))
    }

    pub fn mark_all_read(&mut self) -> Vec<Effect> {
        self.mark(ReadTarget::All)
    }

    fn mark(&mut self, target: ReadTarget) -> Vec<Effect> {
        if self.phase == Phase::Closed {
            return Vec::new();
        }
        self.policy
            .apply(&mut self.conversations, &target)
            .into_iter()
            .map(Effect::Acknowledge)
            .collect()
    }

    /// Outcome of an acknowledgement issued for `receipt`.
    pub fn on_ack_result(&mut self, receipt: &ReadReceipt, result: Result<(), String>) {
        if let Err(error) = result {
            debug!(conversation = %receipt.conversation_id, %error, policy = self.policy.name(), "Read acknowledgement failed");
            self.policy.on_failure(&mut self.conversations, receipt);
        }
    }

    pub fn set_directory(&mut self, employees: Vec<Employee>) {
        self.directory = Arc::new(Directory::new(employees));
    }

    /// The push channel dropped: presence is no longer known.
    pub fn on_disconnected(&mut self) {
        self.presence.clear();
    }

    pub fn close(&mut self) {
        self.phase = Phase::Closed;
        self.presence.clear();
        self.pending.clear();
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            phase: self.phase,
            local_user: self.local_user.clone(),
            conversations: self.conversations.as_slice().to_vec(),
            online: self.presence.snapshot(),
            directory: Arc::clone(&self.directory),
        }
    }
}

fn is_newer_than(conv: &Conversation, event: &MessageEvent) -> bool {
    let pulled_id = conv.last_message.as_ref().and_then(|m| m.id.as_ref());
    if pulled_id.is_some() && pulled_id == event.message.id.as_ref() {
        return false;
    }
    conv.effective_timestamp()
        .map_or(true, |ts| event.message.created_at > ts)
}

#[cfg(test)]
mod tests {
    use hrms_shared::models::MessageSnapshot;
    use hrms_shared::protocol::PresenceEvent;
    use hrms_shared::types::{MessageId, PresenceStatus};

    use super::*;
    use crate::conversations::tests::{conv, msg_event, t};
    use crate::optimistic::RollbackOnFailure;

    fn me() -> UserId {
        UserId::new("me")
    }

    fn ok(items: Vec<Conversation>) -> Result<Batch<Conversation>, String> {
        Ok(Batch { items, dropped: 0 })
    }

    fn ready(items: Vec<Conversation>) -> ChatStore {
        let mut store = ChatStore::new(me());
        assert_eq!(store.request_reload(), vec![Effect::Reload]);
        assert!(store.finish_pull(ok(items)).is_empty());
        assert_eq!(store.phase(), Phase::Ready);
        store
    }

    fn ids(store: &ChatStore) -> Vec<String> {
        store.conversations().iter().map(|c| c.id.0.clone()).collect()
    }

    fn unread(store: &ChatStore, id: &str) -> u32 {
        store
            .conversations()
            .get(&ConversationId::new(id))
            .unwrap()
            .unread_count
    }

    fn online(user: &str) -> PushEvent {
        PushEvent::Presence(PresenceEvent {
            user_id: UserId::new(user),
            status: PresenceStatus::Online,
        })
    }

    #[test]
    fn phases_follow_the_pull_lifecycle() {
        let mut store = ChatStore::new(me());
        assert_eq!(store.phase(), Phase::Uninitialized);
        store.request_reload();
        assert_eq!(store.phase(), Phase::Loading);
        assert!(store.request_reload().is_empty(), "no second pull while loading");
        store.finish_pull(ok(vec![]));
        assert_eq!(store.phase(), Phase::Ready);
        store.request_reload();
        assert_eq!(store.phase(), Phase::Refreshing);
    }

    #[test]
    fn message_for_known_conversation_reorders_and_counts() {
        let mut store = ready(vec![conv("a", Some(1), 0), conv("b", Some(2), 0)]);
        assert_eq!(ids(&store), vec!["b", "a"]);

        let effects = store.on_push(PushEvent::Message(msg_event("a", "peer", 3)));
        assert!(effects.is_empty());
        assert_eq!(ids(&store), vec!["a", "b"]);
        assert_eq!(unread(&store, "a"), 1);
    }

    #[test]
    fn unknown_conversation_requests_exactly_one_reload() {
        let mut store = ready(vec![conv("a", Some(1), 0)]);

        let effects = store.on_push(PushEvent::Message(msg_event("zzz", "peer", 2)));
        assert_eq!(effects, vec![Effect::Reload]);
        assert_eq!(ids(&store), vec!["a"], "no speculative insert");
        assert_eq!(store.phase(), Phase::Refreshing);

        // More unknown traffic while the reload is in flight coalesces into it.
        assert!(store.on_push(PushEvent::Message(msg_event("zzz", "peer", 3))).is_empty());
        assert!(store.on_push(PushEvent::Message(msg_event("yyy", "peer", 4))).is_empty());
    }

    #[test]
    fn buffered_events_replay_after_the_pull() {
        let mut store = ChatStore::new(me());
        store.request_reload();

        store.on_push(PushEvent::Message(msg_event("a", "peer", 10)));
        store.on_push(PushEvent::Message(msg_event("a", "me", 11)));
        store.on_push(PushEvent::Message(msg_event("b", "peer", 12)));
        assert!(store.conversations().is_empty());

        let effects = store.finish_pull(ok(vec![conv("a", Some(1), 5), conv("b", Some(2), 0)]));
        assert!(effects.is_empty());
        assert_eq!(unread(&store, "a"), 0, "own message resets");
        assert_eq!(unread(&store, "b"), 1);
        assert_eq!(ids(&store), vec!["b", "a"]);
    }

    #[test]
    fn replay_skips_events_the_pull_already_covers() {
        let mut store = ready(vec![conv("a", Some(1), 0)]);
        store.request_reload();

        let mut seen = msg_event("a", "peer", 5);
        seen.message.id = Some(MessageId::new("m5"));
        store.on_push(PushEvent::Message(seen.clone()));
        store.on_push(PushEvent::Message(msg_event("a", "peer", 3)));

        let mut pulled = conv("a", Some(5), 2);
        pulled.last_message = Some(MessageSnapshot {
            id: Some(MessageId::new("m5")),
            ..seen.message.clone()
        });
        store.finish_pull(ok(vec![pulled]));

        assert_eq!(unread(&store, "a"), 2, "server count already includes both");
    }

    #[test]
    fn resync_adds_conversation_then_applies_event_once() {
        let mut store = ready(vec![conv("a", Some(1), 0)]);
        assert_eq!(
            store.on_push(PushEvent::Message(msg_event("new", "peer", 9))),
            vec![Effect::Reload]
        );

        // The server has the conversation but not yet this message.
        let effects = store.finish_pull(ok(vec![conv("a", Some(1), 0), conv("new", Some(8), 0)]));
        assert!(effects.is_empty());
        assert_eq!(ids(&store), vec!["new", "a"]);
        assert_eq!(unread(&store, "new"), 1);
    }

    #[test]
    fn still_unknown_after_resync_is_dropped() {
        let mut store = ready(vec![conv("a", Some(1), 0)]);
        store.on_push(PushEvent::Message(msg_event("ghost", "peer", 9)));

        let effects = store.finish_pull(ok(vec![conv("a", Some(1), 0)]));
        assert!(effects.is_empty(), "no reload loop");
        assert_eq!(ids(&store), vec!["a"]);
    }

    #[test]
    fn unknown_buffered_during_initial_load_gets_one_follow_up_reload() {
        let mut store = ChatStore::new(me());
        store.request_reload();
        store.on_push(PushEvent::Message(msg_event("late", "peer", 9)));

        let effects = store.finish_pull(ok(vec![conv("a", Some(1), 0)]));
        assert_eq!(effects, vec![Effect::Reload]);
        assert_eq!(store.phase(), Phase::Refreshing);

        let effects = store.finish_pull(ok(vec![conv("a", Some(1), 0), conv("late", Some(2), 0)]));
        assert!(effects.is_empty());
        assert_eq!(unread(&store, "late"), 1);
    }

    #[test]
    fn failed_pull_keeps_previous_list() {
        let mut store = ready(vec![conv("a", Some(1), 0)]);
        store.request_reload();
        store.on_push(PushEvent::Message(msg_event("a", "peer", 2)));

        let effects = store.finish_pull(Err("connection refused".into()));
        assert!(effects.is_empty(), "no automatic retry");
        assert_eq!(store.phase(), Phase::Ready);
        assert_eq!(ids(&store), vec!["a"]);
        assert_eq!(unread(&store, "a"), 1);
    }

    #[test]
    fn presence_applies_even_while_loading() {
        let mut store = ChatStore::new(me());
        store.request_reload();
        store.on_push(online("u1"));
        store.on_push(online("u1"));
        assert_eq!(store.presence().len(), 1);
        assert_eq!(store.snapshot().summary().online, 1);

        store.on_disconnected();
        assert!(store.presence().is_empty());
    }

    #[test]
    fn mark_read_emits_acknowledgements() {
        let mut store = ready(vec![conv("a", Some(1), 3), conv("b", Some(2), 0)]);

        let effects = store.mark_all_read();
        assert_eq!(effects.len(), 1);
        assert!(matches!(&effects[0], Effect::Acknowledge(r) if r.conversation_id == ConversationId::new("a") && r.previous_unread == 3));
        assert_eq!(store.snapshot().summary().unread, 0);

        // Default policy keeps the optimistic state on failure.
        if let Effect::Acknowledge(receipt) = &effects[0] {
            store.on_ack_result(receipt, Err("503".into()));
        }
        assert_eq!(unread(&store, "a"), 0);
    }

    #[test]
    fn rollback_policy_restores_on_failed_ack() {
        let mut store = ChatStore::with_policy(me(), Box::new(RollbackOnFailure));
        store.request_reload();
        store.finish_pull(ok(vec![conv("a", Some(1), 3)]));

        let effects = store.mark_read(&ConversationId::new("a"));
        let Effect::Acknowledge(receipt) = &effects[0] else {
            panic!("expected acknowledgement");
        };
        store.on_ack_result(receipt, Err("timeout".into()));
        assert_eq!(unread(&store, "a"), 3);
    }

    #[test]
    fn sorted_at_every_observable_point() {
        let mut store = ready(vec![conv("a", Some(3), 0), conv("b", Some(1), 0), conv("c", None, 0)]);
        let script = [("b", 4), ("c", 2), ("a", 1), ("c", 6), ("b", 5)];
        for (id, at) in script {
            store.on_push(PushEvent::Message(msg_event(id, "peer", at)));
            assert!(store.conversations().is_sorted());
            let snap = store.snapshot();
            assert!(snap
                .conversations
                .windows(2)
                .all(|w| w[0].effective_timestamp() >= w[1].effective_timestamp()));
        }
        assert_eq!(store.snapshot().conversations[0].updated_at, Some(t(6)));
    }

    #[test]
    fn closed_store_ignores_input() {
        let mut store = ready(vec![conv("a", Some(1), 2)]);
        store.on_push(online("u1"));
        store.close();

        assert_eq!(store.phase(), Phase::Closed);
        assert!(store.presence().is_empty());
        assert!(store.on_push(PushEvent::Message(msg_event("zzz", "peer", 2))).is_empty());
        assert!(store.request_reload().is_empty());
        assert!(store.finish_pull(ok(vec![])).is_empty());
        assert_eq!(ids(&store), vec!["a"]);
    }
}
