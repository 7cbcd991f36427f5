use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health: liveness probe, returns server metadata.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let personas: Vec<&str> = state.pipeline.personas.names().collect();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.pipeline.completion.model(),
        "default_persona": state.pipeline.personas.default_persona().name,
        "personas": personas,
    }))
}
