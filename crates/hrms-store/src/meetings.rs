//! CRUD operations for [`ActiveMeeting`] records.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::params;

use hrms_shared::types::ConversationId;

use crate::database::Database;
use crate::error::Result;
use crate::models::ActiveMeeting;

// Fixed-width UTC timestamps so SQL string comparison matches time order.
fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl Database {
    /// Record (or extend) a live meeting for a conversation.
    pub fn record_meeting(&self, meeting: &ActiveMeeting) -> Result<()> {
        self.conn().execute(
            "INSERT INTO active_meetings (conversation_id, expires_at)
             VALUES (?1, ?2)
             ON CONFLICT(conversation_id) DO UPDATE SET expires_at = excluded.expires_at",
            params![meeting.conversation_id.as_str(), encode_ts(meeting.expires_at)],
        )?;
        Ok(())
    }

    /// Remove a meeting badge. Returns `true` if a row was deleted.
    pub fn end_meeting(&self, conversation_id: &ConversationId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM active_meetings WHERE conversation_id = ?1",
            params![conversation_id.as_str()],
        )?;
        Ok(affected > 0)
    }

    /// Prune meetings that expired at or before `now`, then return the
    /// remaining ones ordered by expiry.
    pub fn live_meetings(&self, now: DateTime<Utc>) -> Result<Vec<ActiveMeeting>> {
        let pruned = self.conn().execute(
            "DELETE FROM active_meetings WHERE expires_at <= ?1",
            params![encode_ts(now)],
        )?;
        if pruned > 0 {
            tracing::debug!(pruned, "pruned expired meetings");
        }

        let mut stmt = self.conn().prepare(
            "SELECT conversation_id, expires_at
             FROM active_meetings
             ORDER BY expires_at ASC",
        )?;

        let rows = stmt.query_map([], row_to_meeting)?;

        let mut meetings = Vec::new();
        for row in rows {
            meetings.push(row?);
        }
        Ok(meetings)
    }
}

/// Map a `rusqlite::Row` to an [`ActiveMeeting`].
fn row_to_meeting(row: &rusqlite::Row<'_>) -> rusqlite::Result<ActiveMeeting> {
    let conversation_id: String = row.get(0)?;
    let expires_str: String = row.get(1)?;

    let expires_at = DateTime::parse_from_rfc3339(&expires_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(ActiveMeeting {
        conversation_id: ConversationId(conversation_id),
        expires_at,
    })
}
