//! "Live meeting" badges backed by the local store.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use hrms_shared::types::ConversationId;
use hrms_store::{ActiveMeeting, Database};

use crate::error::ClientError;

pub struct MeetingBadges {
    db: Database,
}

impl MeetingBadges {
    /// Open the badge cache at `path`, or in the platform data directory.
    pub fn open(path: Option<&Path>) -> Result<Self, ClientError> {
        let db = match path {
            Some(path) => Database::open_at(path)?,
            None => Database::new()?,
        };
        Ok(Self { db })
    }

    pub fn in_memory() -> Result<Self, ClientError> {
        Ok(Self {
            db: Database::open_in_memory()?,
        })
    }

    /// Show a badge on `conversation_id` for `duration` from `now`.
    pub fn start(
        &self,
        conversation_id: &ConversationId,
        duration: Duration,
        now: DateTime<Utc>,
    ) -> Result<(), ClientError> {
        let meeting = ActiveMeeting {
            conversation_id: conversation_id.clone(),
            expires_at: now + duration,
        };
        self.db.record_meeting(&meeting)?;
        info!(conversation = %conversation_id, expires_at = %meeting.expires_at, "Meeting started");
        Ok(())
    }

    pub fn end(&self, conversation_id: &ConversationId) -> Result<bool, ClientError> {
        Ok(self.db.end_meeting(conversation_id)?)
    }

    pub fn live(&self, now: DateTime<Utc>) -> Result<Vec<ActiveMeeting>, ClientError> {
        Ok(self.db.live_meetings(now)?)
    }

    /// Conversations that currently carry a badge.
    pub fn live_set(&self, now: DateTime<Utc>) -> Result<HashSet<ConversationId>, ClientError> {
        Ok(self
            .live(now)?
            .into_iter()
            .map(|m| m.conversation_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn badges_expire() {
        let badges = MeetingBadges::in_memory().unwrap();
        let standup = ConversationId::new("standup");
        badges.start(&standup, Duration::minutes(15), t0()).unwrap();

        assert!(badges.live_set(t0()).unwrap().contains(&standup));
        assert!(badges.live_set(t0() + Duration::minutes(15)).unwrap().is_empty());
    }

    #[test]
    fn ending_removes_the_badge() {
        let badges = MeetingBadges::in_memory().unwrap();
        let id = ConversationId::new("c1");
        badges.start(&id, Duration::hours(1), t0()).unwrap();

        assert!(badges.end(&id).unwrap());
        assert!(badges.live(t0()).unwrap().is_empty());
    }

    #[test]
    fn opens_at_an_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("badges.db");
        let badges = MeetingBadges::open(Some(&path)).unwrap();
        badges
            .start(&ConversationId::new("c1"), Duration::minutes(5), t0())
            .unwrap();
        assert!(path.exists());
    }
}
