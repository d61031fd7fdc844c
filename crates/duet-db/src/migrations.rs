use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (users, messages)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                credential  TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE messages (
                id          TEXT PRIMARY KEY,
                sender_id   TEXT NOT NULL REFERENCES users(id),
                receiver_id TEXT NOT NULL REFERENCES users(id),
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_messages_pair
                ON messages(sender_id, receiver_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
