//! In-memory presence tracking.
//!
//! Holds the set of users currently known to be online, fed only by
//! presence events from the push channel. Never persisted.

use std::collections::HashSet;

use tracing::debug;

use hrms_shared::protocol::PresenceEvent;
use hrms_shared::types::{PresenceStatus, UserId};

#[derive(Debug, Clone, Default)]
pub struct PresenceSet {
    online: HashSet<UserId>,
}

impl PresenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a presence event. Returns `true` if the set changed; repeated
    /// events for the same status are no-ops.
    pub fn apply(&mut self, event: &PresenceEvent) -> bool {
        let changed = match event.status {
            PresenceStatus::Online => self.online.insert(event.user_id.clone()),
            PresenceStatus::Offline => self.online.remove(&event.user_id),
        };
        if changed {
            debug!(user = %event.user_id.short(), status = ?event.status, "Presence changed");
        }
        changed
    }

    pub fn is_online(&self, user: &UserId) -> bool {
        self.online.contains(user)
    }

    pub fn len(&self) -> usize {
        self.online.len()
    }

    pub fn is_empty(&self) -> bool {
        self.online.is_empty()
    }

    /// Forget everyone, e.g. after the push channel dropped.
    pub fn clear(&mut self) {
        self.online.clear();
    }

    pub fn snapshot(&self) -> HashSet<UserId> {
        self.online.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(user: &str, status: PresenceStatus) -> PresenceEvent {
        PresenceEvent {
            user_id: UserId::new(user),
            status,
        }
    }

    #[test]
    fn repeated_online_is_idempotent() {
        let mut set = PresenceSet::new();
        assert!(set.apply(&event("u1", PresenceStatus::Online)));
        assert!(!set.apply(&event("u1", PresenceStatus::Online)));
        assert_eq!(set.len(), 1);
        assert!(set.is_online(&UserId::new("u1")));
    }

    #[test]
    fn offline_removes_and_unknown_offline_is_noop() {
        let mut set = PresenceSet::new();
        set.apply(&event("u1", PresenceStatus::Online));
        assert!(!set.apply(&event("u2", PresenceStatus::Offline)));
        assert!(set.apply(&event("u1", PresenceStatus::Offline)));
        assert!(set.is_empty());
    }

    #[test]
    fn clear_resets_everything() {
        let mut set = PresenceSet::new();
        set.apply(&event("u1", PresenceStatus::Online));
        set.apply(&event("u2", PresenceStatus::Online));
        set.clear();
        assert_eq!(set.len(), 0);
    }
}
