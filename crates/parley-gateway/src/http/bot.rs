//! Inbound message webhook: POST /bot and POST /bot/{persona}.
//!
//! Request: form or JSON with `From` and `Body`.
//! Replied:  200 + TwiML envelope.
//! Disabled sender: 204, empty body.
//! Errors: 404 unknown persona, 500 storage, 502 completion.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use parley_agent::{process_turn, InboundTurn, Persona, TurnOutcome};
use std::sync::Arc;
use tracing::{info, instrument};

use super::error::ApiError;
use super::extract::FormOrJson;
use crate::app::AppState;
use crate::twiml::MessagingResponse;

/// POST /bot, served by the default persona.
pub async fn default_persona_handler(
    State(state): State<Arc<AppState>>,
    FormOrJson(inbound): FormOrJson<InboundTurn>,
) -> Result<Response, ApiError> {
    let persona = state.pipeline.personas.default_persona();
    run_turn(&state, persona, inbound).await
}

/// POST /bot/{persona}
pub async fn named_persona_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    FormOrJson(inbound): FormOrJson<InboundTurn>,
) -> Result<Response, ApiError> {
    let persona = state
        .pipeline
        .personas
        .get(&name)
        .ok_or(ApiError::UnknownPersona(name))?;
    run_turn(&state, persona, inbound).await
}

#[instrument(
    skip_all,
    fields(request_id = %uuid::Uuid::new_v4(), persona = %persona.name)
)]
async fn run_turn(
    state: &AppState,
    persona: &Persona,
    inbound: InboundTurn,
) -> Result<Response, ApiError> {
    info!(sender = %inbound.sender, bytes = inbound.content.len(), "inbound message");

    match process_turn(&state.pipeline, persona, &inbound).await? {
        TurnOutcome::Rejected => Ok(StatusCode::NO_CONTENT.into_response()),
        TurnOutcome::Replied { reply, .. } => Ok(MessagingResponse::new(reply).into_response()),
    }
}
