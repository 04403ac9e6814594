//! v001 -- Initial schema creation.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Active meetings (live badge cache)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS active_meetings (
    conversation_id TEXT PRIMARY KEY NOT NULL,
    expires_at      TEXT NOT NULL                -- RFC-3339, UTC
);

CREATE INDEX IF NOT EXISTS idx_active_meetings_expires
    ON active_meetings(expires_at);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
