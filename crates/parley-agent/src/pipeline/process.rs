use parley_core::Role;
use parley_store::{StoreError, TurnId};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::gate;
use crate::history;
use crate::persona::Persona;
use crate::provider::CompletionError;

use super::context::PipelineContext;
use super::stage::TurnStage;

/// One inbound chat message. `sender` is used verbatim, empty included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InboundTurn {
    #[serde(rename = "From", default)]
    pub sender: String,
    #[serde(rename = "Body", default)]
    pub content: String,
}

impl InboundTurn {
    pub fn new(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
        }
    }
}

/// How a turn ended when nothing failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Sender is disabled. Nothing was stored and nothing should be sent.
    Rejected,
    /// Both sides of the exchange are stored; `reply` goes back to the sender.
    Replied {
        reply: String,
        human_turn: TurnId,
        assistant_turn: TurnId,
    },
}

/// A turn that ended in `TurnStage::Failed`.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The store could not be read or written. `stage` is the last stage the
    /// turn reached before the failure.
    #[error("storage failed after {stage}: {source}")]
    Storage {
        stage: TurnStage,
        #[source]
        source: StoreError,
    },

    /// The provider call failed. The human turn is already stored.
    #[error("completion failed: {0}")]
    Completion(#[from] CompletionError),
}

impl PipelineError {
    fn storage(stage: TurnStage) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::Storage { stage, source }
    }
}

/// Run one inbound message through the pipeline for `persona`.
///
/// The human turn is written before the completion call, so a provider
/// outage loses the reply but never the user's message. The history block
/// covers only turns written before this one.
#[instrument(
    skip(ctx, persona, inbound),
    fields(sender = %inbound.sender, persona = %persona.name)
)]
pub async fn process_turn(
    ctx: &PipelineContext,
    persona: &Persona,
    inbound: &InboundTurn,
) -> Result<TurnOutcome, PipelineError> {
    let sender = inbound.sender.as_str();
    let mut stage = TurnStage::Received;
    debug!(%stage, len = inbound.content.len(), "turn received");

    let admitted =
        gate::admit(&ctx.store, sender).map_err(PipelineError::storage(stage))?;
    if !admitted {
        stage = TurnStage::Rejected;
        info!(%stage, "sender disabled, dropping message");
        return Ok(TurnOutcome::Rejected);
    }
    stage = TurnStage::Gated;

    let human_turn = ctx
        .store
        .append(sender, &inbound.content, Role::Human)
        .map_err(PipelineError::storage(stage))?;
    let past = ctx
        .store
        .history_before(sender, human_turn)
        .map_err(PipelineError::storage(stage))?;
    let history = history::assemble(&past, persona.history_filter);
    stage = TurnStage::HistoryLoaded;
    debug!(%stage, %human_turn, past_turns = past.len(), "history loaded");

    let prompt = persona.template.build(&history, &inbound.content);
    stage = TurnStage::PromptBuilt;
    debug!(%stage, prompt_len = prompt.len(), "prompt built");

    // The only await: no store lock is held here.
    let reply = match ctx.completion.complete(&prompt).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!(
                stage = %TurnStage::Failed,
                %human_turn,
                timeout = e.is_timeout(),
                error = %e,
                "completion failed, human turn kept"
            );
            return Err(e.into());
        }
    };
    stage = TurnStage::Completed;

    let assistant_turn = ctx
        .store
        .append(sender, &reply, Role::Assistant)
        .map_err(PipelineError::storage(stage))?;
    stage = TurnStage::Logged;
    info!(%stage, %human_turn, %assistant_turn, reply_len = reply.len(), "turn complete");

    Ok(TurnOutcome::Replied {
        reply,
        human_turn,
        assistant_turn,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_turn_reads_twilio_field_names() {
        let turn: InboundTurn =
            serde_json::from_str(r#"{"From": "whatsapp:+1555", "Body": "oi"}"#).unwrap();
        assert_eq!(turn, InboundTurn::new("whatsapp:+1555", "oi"));
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let turn: InboundTurn = serde_json::from_str(r#"{"Body": "oi"}"#).unwrap();
        assert_eq!(turn.sender, "");
        assert_eq!(turn.content, "oi");
    }
}
