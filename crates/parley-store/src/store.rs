use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use parley_core::Role;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info, instrument};

use crate::error::{Result, StoreError};
use crate::types::{Turn, TurnId};

const TURN_COLUMNS: &str = "id, sender, content, role, created_at";

/// Durable, append-only conversation log plus the disabled-sender set.
///
/// Wraps a single SQLite connection in a `Mutex`: every call takes the lock,
/// finishes its statement and releases it, so a write is visible to the next
/// read before the call returns. Never hold the lock across an `.await`.
pub struct ConversationStore {
    db: Mutex<Connection>,
}

impl ConversationStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    /// Open (or create) the database file and run schema setup.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        info!(path = %path.display(), "opening SQLite database");

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL;")?;
        crate::db::init_db(&conn)?;
        Ok(Self::new(conn))
    }

    /// Private in-memory database. Used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        crate::db::init_db(&conn)?;
        Ok(Self::new(conn))
    }

    /// Persist one turn and return its id.
    #[instrument(skip(self, content), fields(sender = %sender, role = %role, len = content.len()))]
    pub fn append(&self, sender: &str, content: &str, role: Role) -> Result<TurnId> {
        let now = chrono::Utc::now().to_rfc3339();
        let db = self.conn();
        db.execute(
            "INSERT INTO turns (sender, content, role, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![sender, content, role.as_str(), now],
        )?;
        let id = TurnId(db.last_insert_rowid());
        debug!(turn_id = %id, "turn appended");
        Ok(id)
    }

    /// Every turn for `sender`, oldest first. Unknown senders yield an empty vec.
    #[instrument(skip(self), fields(sender = %sender))]
    pub fn history(&self, sender: &str) -> Result<Vec<Turn>> {
        let db = self.conn();
        let mut stmt = db.prepare(&format!(
            "SELECT {TURN_COLUMNS} FROM turns
             WHERE sender = ?1
             ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(rusqlite::params![sender], read_row)?;
        collect_turns(rows)
    }

    /// Turns for `sender` written strictly before `before`, oldest first.
    ///
    /// Lets a request read the conversation as it stood when the request
    /// arrived, even though its own inbound turn is already stored.
    #[instrument(skip(self), fields(sender = %sender, before = %before))]
    pub fn history_before(&self, sender: &str, before: TurnId) -> Result<Vec<Turn>> {
        let db = self.conn();
        let mut stmt = db.prepare(&format!(
            "SELECT {TURN_COLUMNS} FROM turns
             WHERE sender = ?1 AND id < ?2
             ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(rusqlite::params![sender, before.0], read_row)?;
        collect_turns(rows)
    }

    /// Whether `sender` has been disabled.
    #[instrument(skip(self), fields(sender = %sender))]
    pub fn is_disabled(&self, sender: &str) -> Result<bool> {
        let db = self.conn();
        let hit: Option<i64> = db
            .query_row(
                "SELECT 1 FROM disabled_senders WHERE sender = ?1",
                rusqlite::params![sender],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hit.is_some())
    }

    /// Add `sender` to the disabled set.
    ///
    /// Idempotent: returns `true` when a new record was written, `false` when
    /// the sender was already disabled.
    #[instrument(skip(self), fields(sender = %sender))]
    pub fn disable(&self, sender: &str) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();
        let db = self.conn();
        let inserted = db.execute(
            "INSERT OR IGNORE INTO disabled_senders (sender, disabled_at)
             VALUES (?1, ?2)",
            rusqlite::params![sender, now],
        )?;
        if inserted > 0 {
            info!("sender disabled");
        } else {
            debug!("sender already disabled");
        }
        Ok(inserted > 0)
    }

    /// Recover the connection even if a previous holder panicked; SQLite
    /// statements are atomic so the data itself is never half-written.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Raw row shape; the role string is validated afterwards so a bad value
/// surfaces as `StoreError::Corrupt` instead of being dropped.
type RawTurn = (i64, String, String, String, String);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTurn> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn collect_turns(
    rows: impl Iterator<Item = rusqlite::Result<RawTurn>>,
) -> Result<Vec<Turn>> {
    rows.map(|row| {
        let (id, sender, content, role, created_at) = row?;
        let role = role
            .parse::<Role>()
            .map_err(|reason| StoreError::Corrupt { id, reason })?;
        Ok(Turn {
            id: TurnId(id),
            sender,
            content,
            role,
            created_at,
        })
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ConversationStore {
        ConversationStore::open_in_memory().expect("in-memory store")
    }

    #[test]
    fn unknown_sender_has_empty_history() {
        let s = store();
        assert!(s.history("+1999").unwrap().is_empty());
    }

    #[test]
    fn history_preserves_write_order_and_fields() {
        let s = store();
        s.append("+1555", "hi", Role::Human).unwrap();
        s.append("+1555", "hello! how can I help?", Role::Assistant).unwrap();
        s.append("+1555", "pricing?", Role::Human).unwrap();

        let turns = s.history("+1555").unwrap();
        let got: Vec<(&str, Role)> = turns
            .iter()
            .map(|t| (t.content.as_str(), t.role))
            .collect();
        assert_eq!(
            got,
            vec![
                ("hi", Role::Human),
                ("hello! how can I help?", Role::Assistant),
                ("pricing?", Role::Human),
            ]
        );
        assert!(turns.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn senders_are_partitioned() {
        let s = store();
        s.append("+1555", "mine", Role::Human).unwrap();
        s.append("+1666", "theirs", Role::Human).unwrap();

        let turns = s.history("+1555").unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "mine");
    }

    #[test]
    fn empty_sender_is_a_valid_key() {
        let s = store();
        s.append("", "anonymous", Role::Human).unwrap();
        assert_eq!(s.history("").unwrap().len(), 1);
        assert!(s.history("+1555").unwrap().is_empty());
    }

    #[test]
    fn history_before_excludes_the_boundary_turn() {
        let s = store();
        s.append("+1555", "one", Role::Human).unwrap();
        let second = s.append("+1555", "two", Role::Human).unwrap();
        s.append("+1555", "three", Role::Human).unwrap();

        let turns = s.history_before("+1555", second).unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "one");
    }

    #[test]
    fn disable_is_idempotent() {
        let s = store();
        assert!(!s.is_disabled("+1555").unwrap());
        assert!(s.disable("+1555").unwrap());
        assert!(!s.disable("+1555").unwrap());
        assert!(s.is_disabled("+1555").unwrap());

        let count: i64 = s
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM disabled_senders WHERE sender = ?1",
                rusqlite::params!["+1555"],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn legacy_ai_rows_read_back_as_assistant() {
        let s = store();
        s.conn()
            .execute(
                "INSERT INTO turns (sender, content, role, created_at)
                 VALUES ('+1555', 'old reply', 'ai', '2024-01-01T00:00:00Z')",
                [],
            )
            .unwrap();
        let turns = s.history("+1555").unwrap();
        assert_eq!(turns[0].role, Role::Assistant);
    }

    #[test]
    fn unknown_role_surfaces_as_corrupt() {
        let s = store();
        s.conn()
            .execute(
                "INSERT INTO turns (sender, content, role, created_at)
                 VALUES ('+1555', 'x', 'system', '2024-01-01T00:00:00Z')",
                [],
            )
            .unwrap();
        let err = s.history("+1555").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }
}
