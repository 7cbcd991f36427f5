//! Conversation turn pipeline.
//!
//! `process_turn` runs one inbound message end to end:
//! gate → store human turn → load history → build prompt → complete →
//! store assistant turn. The HTTP layer only maps the outcome to a status
//! code and envelope.

pub mod context;
pub mod process;
pub mod stage;

pub use context::PipelineContext;
pub use process::{process_turn, InboundTurn, PipelineError, TurnOutcome};
pub use stage::TurnStage;
