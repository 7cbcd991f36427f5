//! Administrative endpoints.
//!
//! Auth: when `admin.token` is configured, `Authorization: Bearer <token>`
//! is required; otherwise the endpoints are open.
//!
//! POST /admin/disable          `{"sender": "whatsapp:+1555"}` (form or JSON)
//! GET  /admin/history/{sender}  turns for one sender, oldest first

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use parley_store::Turn;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use super::error::ApiError;
use super::extract::FormOrJson;
use crate::app::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DisableRequest {
    #[serde(default, alias = "From")]
    pub sender: String,
}

/// POST /admin/disable: stop answering a sender. Idempotent.
pub async fn disable_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    FormOrJson(req): FormOrJson<DisableRequest>,
) -> Result<Json<Value>, ApiError> {
    check_auth(&state, &headers)?;

    // Stored verbatim: the gate matches the raw `From` value.
    let sender = req.sender.as_str();
    if sender.trim().is_empty() {
        return Err(ApiError::Validation(
            "sender is required, e.g. {\"sender\": \"whatsapp:+15550001111\"}".to_string(),
        ));
    }

    let created = state.pipeline.store.disable(sender)?;
    info!(sender = %sender, already_disabled = !created, "admin disabled sender");
    Ok(Json(json!({
        "ok": true,
        "sender": sender,
        "already_disabled": !created,
    })))
}

/// GET /admin/history/{sender}
pub async fn history_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(sender): Path<String>,
) -> Result<Json<Value>, ApiError> {
    check_auth(&state, &headers)?;

    let turns: Vec<Turn> = state.pipeline.store.history(&sender)?;
    let disabled = state.pipeline.store.is_disabled(&sender)?;
    Ok(Json(json!({
        "sender": sender,
        "disabled": disabled,
        "turns": turns,
    })))
}

fn check_auth(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.config.admin.token.as_deref() else {
        return Ok(());
    };
    match extract_bearer(headers) {
        Some(token) if token == expected => Ok(()),
        Some(_) => Err(ApiError::Unauthorized("bearer token mismatch".to_string())),
        None => Err(ApiError::Unauthorized(
            "set 'Authorization: Bearer <admin-token>' header".to_string(),
        )),
    }
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}
