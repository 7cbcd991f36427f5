//! Disabled-sender gate.

use parley_store::{ConversationStore, StoreError};

/// Returns `true` when `sender` may be processed.
///
/// A disabled sender gets no history lookup, no prompt, no completion call
/// and no stored turn.
pub fn admit(store: &ConversationStore, sender: &str) -> Result<bool, StoreError> {
    Ok(!store.is_disabled(sender)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_sender_is_admitted() {
        let store = ConversationStore::open_in_memory().unwrap();
        assert!(admit(&store, "+1555").unwrap());
    }

    #[test]
    fn disabled_sender_is_refused() {
        let store = ConversationStore::open_in_memory().unwrap();
        store.disable("+1555").unwrap();
        assert!(!admit(&store, "+1555").unwrap());
        assert!(admit(&store, "+1666").unwrap());
    }
}
