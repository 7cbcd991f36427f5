//! Conversation turn pipeline: gate, history, prompt, completion, logging.

pub mod completion;
pub mod gate;
pub mod history;
pub mod openai;
pub mod persona;
pub mod pipeline;
pub mod prompt;
pub mod provider;

pub use completion::CompletionClient;
pub use persona::{Persona, PersonaTable};
pub use pipeline::{process_turn, InboundTurn, PipelineContext, PipelineError, TurnOutcome};
pub use prompt::PromptTemplate;
pub use provider::{CompletionError, LlmProvider};
