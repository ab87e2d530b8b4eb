use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn apply(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL CHECK (length(trim(name)) > 0),
            description TEXT,
            category TEXT NOT NULL,
            location TEXT NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('lost', 'found')),
            status TEXT NOT NULL DEFAULT 'active'
                CHECK (status IN ('active', 'matched', 'returned')),
            reward_amount REAL CHECK (reward_amount IS NULL OR reward_amount >= 0),
            image_ref TEXT,
            contact TEXT,
            occurred_on TEXT,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS reports_status_created
            ON reports (status, created_at DESC);

        CREATE TRIGGER IF NOT EXISTS reports_kind_immutable
        BEFORE UPDATE OF kind ON reports
        WHEN new.kind <> old.kind
        BEGIN
            SELECT RAISE(ABORT, 'report kind is immutable');
        END;

        CREATE TRIGGER IF NOT EXISTS reports_status_forward_only
        BEFORE UPDATE OF status ON reports
        WHEN new.status <> old.status
         AND NOT ((old.status = 'active' AND new.status = 'matched')
               OR (old.status = 'matched' AND new.status = 'returned'))
        BEGIN
            SELECT RAISE(ABORT, 'report status can only move forward');
        END;
        "#,
    )
    .context("applying schema migrations")?;
    Ok(())
}
