use rusqlite::{Connection, Result};

/// Initialise the turn log and the disabled-sender set.
///
/// Safe to call on every startup; uses `IF NOT EXISTS` throughout.
pub fn init_db(conn: &Connection) -> Result<()> {
    create_turns_table(conn)?;
    create_disabled_senders_table(conn)?;
    Ok(())
}

/// Append-only. Ordering within a sender is by `id`, never by `created_at`.
fn create_turns_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS turns (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            sender      TEXT NOT NULL,
            content     TEXT NOT NULL,
            role        TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_turns_sender
            ON turns(sender, id);",
    )
}

fn create_disabled_senders_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS disabled_senders (
            sender       TEXT PRIMARY KEY,
            disabled_at  TEXT NOT NULL
        );",
    )
}
