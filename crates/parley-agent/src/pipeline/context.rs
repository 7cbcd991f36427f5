use std::sync::Arc;

use parley_store::ConversationStore;

use crate::completion::CompletionClient;
use crate::persona::PersonaTable;

/// Everything a turn needs, built once at startup and passed by reference
/// into every `process_turn` call.
pub struct PipelineContext {
    pub store: Arc<ConversationStore>,
    pub completion: CompletionClient,
    pub personas: PersonaTable,
}

impl PipelineContext {
    pub fn new(
        store: Arc<ConversationStore>,
        completion: CompletionClient,
        personas: PersonaTable,
    ) -> Self {
        Self {
            store,
            completion,
            personas,
        }
    }
}
