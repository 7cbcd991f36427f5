use std::fmt;

/// Where a turn is in the pipeline. Logged on every transition.
///
/// Success path: `Received → Gated → HistoryLoaded → PromptBuilt →
/// Completed → Logged`. Terminal alternatives: `Rejected` (sender disabled)
/// and `Failed` (storage or completion error).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStage {
    Received,
    Gated,
    HistoryLoaded,
    PromptBuilt,
    Completed,
    Logged,
    Rejected,
    Failed,
}

impl fmt::Display for TurnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Received => "received",
            Self::Gated => "gated",
            Self::HistoryLoaded => "history_loaded",
            Self::PromptBuilt => "prompt_built",
            Self::Completed => "completed",
            Self::Logged => "logged",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}
