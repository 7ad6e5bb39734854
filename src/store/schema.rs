//! SQLite schema for ingested samples

use rusqlite::Connection;

use crate::error::StoreError;

/// Initialize the sample tables (idempotent)
pub fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS health_samples (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL CHECK (length(user_id) > 0),
            timestamp TEXT NOT NULL,  -- RFC 3339 with offset
            sample_type TEXT NOT NULL,
            value REAL NOT NULL
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS heart_rate_samples (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL CHECK (length(user_id) > 0),
            timestamp TEXT NOT NULL,
            value REAL NOT NULL
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS emotion_samples (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL CHECK (length(user_id) > 0),
            timestamp TEXT NOT NULL,
            valence REAL NOT NULL CHECK (valence BETWEEN 0.0 AND 5.0),
            arousal REAL NOT NULL CHECK (arousal BETWEEN 0.0 AND 5.0),
            label TEXT NOT NULL
        )
        "#,
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_health_user ON health_samples(user_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_heart_rate_user ON heart_rate_samples(user_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_emotion_user ON emotion_samples(user_id)",
        [],
    )?;

    Ok(())
}
