use thiserror::Error;

/// Errors raised by the conversation store. Any of these aborts the
/// request that triggered it.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored row could not be mapped back into a turn.
    #[error("corrupt turn row {id}: {reason}")]
    Corrupt { id: i64, reason: String },

    /// Creating the database directory failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
