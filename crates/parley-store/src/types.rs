use parley_core::Role;
use serde::{Deserialize, Serialize};

/// Store-assigned turn identifier. Strictly increasing in write order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TurnId(pub i64);

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One recorded message. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub sender: String,
    pub content: String,
    pub role: Role,
    /// RFC3339 write time. Informational only.
    pub created_at: String,
}
