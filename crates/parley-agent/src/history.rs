//! Renders a sender's past turns into the prompt's history block.

use parley_core::HistoryFilter;
use parley_store::Turn;

/// Join the content of every turn that passes `filter` with `\n`, oldest
/// first. No history renders as the empty string.
pub fn assemble(turns: &[Turn], filter: HistoryFilter) -> String {
    turns
        .iter()
        .filter(|t| filter.allows(t.role))
        .map(|t| t.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
