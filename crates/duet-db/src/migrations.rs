use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    // Each collection is a table of JSON documents keyed by the store-assigned id.
    // `seq` keeps insertion order stable for listings.
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            seq         INTEGER PRIMARY KEY AUTOINCREMENT,
            id          TEXT NOT NULL UNIQUE,
            doc         TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_users_email
            ON users(json_extract(doc, '$.email'));

        CREATE TABLE IF NOT EXISTS conversations (
            seq         INTEGER PRIMARY KEY AUTOINCREMENT,
            id          TEXT NOT NULL UNIQUE,
            doc         TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS messages (
            seq         INTEGER PRIMARY KEY AUTOINCREMENT,
            id          TEXT NOT NULL UNIQUE,
            doc         TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages(json_extract(doc, '$.conversationId'));
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
