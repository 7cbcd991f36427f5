use axum::{
    routing::{get, post},
    Router,
};
use parley_agent::PipelineContext;
use parley_core::ParleyConfig;
use std::sync::Arc;

/// Central shared state, passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: ParleyConfig,
    pub pipeline: PipelineContext,
}

impl AppState {
    pub fn new(config: ParleyConfig, pipeline: PipelineContext) -> Self {
        Self { config, pipeline }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/bot", post(crate::http::bot::default_persona_handler))
        .route(
            "/bot/{persona}",
            post(crate::http::bot::named_persona_handler),
        )
        .route("/admin/disable", post(crate::http::admin::disable_handler))
        .route(
            "/admin/history/{sender}",
            get(crate::http::admin::history_handler),
        )
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use parley_agent::provider::{ChatRequest, ChatResponse};
    use parley_agent::{CompletionClient, CompletionError, LlmProvider, Persona, PersonaTable};
    use parley_core::{HistoryFilter, Role};
    use parley_store::ConversationStore;
    use serde_json::Value;
    use tower::ServiceExt;

    struct Canned(Option<&'static str>);

    #[async_trait]
    impl LlmProvider for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, CompletionError> {
            match self.0 {
                Some(text) => Ok(ChatResponse {
                    content: text.to_string(),
                    model: req.model.clone(),
                    tokens_in: 1,
                    tokens_out: 1,
                    stop_reason: "stop".to_string(),
                }),
                None => Err(CompletionError::Unavailable("down".to_string())),
            }
        }
    }

    fn state_with(reply: Option<&'static str>, admin_token: Option<&str>) -> Arc<AppState> {
        let store = ConversationStore::open_in_memory().unwrap();
        state_over(store, reply, admin_token)
    }

    fn state_over(
        store: ConversationStore,
        reply: Option<&'static str>,
        admin_token: Option<&str>,
    ) -> Arc<AppState> {
        let mut config = ParleyConfig::default();
        config.admin.token = admin_token.map(String::from);
        let store = Arc::new(store);
        let completion =
            CompletionClient::new(Box::new(Canned(reply)), "gpt-3.5-turbo-16k".to_string(), 0.2);
        let personas = PersonaTable::new(
            vec![
                Persona::new("sales", "S {history} | {message}", HistoryFilter::All).unwrap(),
                Persona::new("workout", "W {history} | {message}", HistoryFilter::HumanOnly)
                    .unwrap(),
            ],
            "sales",
        )
        .unwrap();
        Arc::new(AppState::new(
            config,
            PipelineContext::new(store, completion, personas),
        ))
    }

    fn form_post(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn json_post(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(resp: axum::response::Response) -> String {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn form_message_gets_twiml_reply() {
        let state = state_with(Some("Hi & welcome"), None);
        let resp = build_router(state.clone())
            .oneshot(form_post("/bot", "From=whatsapp%3A%2B1555&Body=hello"))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("application/xml"));
        let body = body_string(resp).await;
        assert!(body.contains("<Response><Message>Hi &amp; welcome</Message></Response>"));

        let turns = state.pipeline.store.history("whatsapp:+1555").unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::Human);
        assert_eq!(turns[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn json_message_is_accepted() {
        let state = state_with(Some("ok"), None);
        let resp = build_router(state.clone())
            .oneshot(json_post("/bot/workout", r#"{"From":"+1555","Body":"squats?"}"#))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(state.pipeline.store.history("+1555").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn disabled_sender_gets_no_content() {
        let state = state_with(Some("never"), None);
        state.pipeline.store.disable("+1555").unwrap();

        let resp = build_router(state.clone())
            .oneshot(form_post("/bot", "From=%2B1555&Body=hello"))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(body_string(resp).await.is_empty());
        assert!(state.pipeline.store.history("+1555").unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_is_bad_gateway_and_keeps_human_turn() {
        let state = state_with(None, None);
        let resp = build_router(state.clone())
            .oneshot(form_post("/bot", "From=%2B1555&Body=hello"))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let body: Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(body["error"], "completion failed");

        let turns = state.pipeline.store.history("+1555").unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "hello");
    }

    #[tokio::test]
    async fn storage_failure_is_internal_error() {
        // Connection without the schema: every store call fails.
        let store = ConversationStore::new(rusqlite::Connection::open_in_memory().unwrap());
        let state = state_over(store, Some("never"), None);
        let resp = build_router(state)
            .oneshot(form_post("/bot", "From=%2B1555&Body=hello"))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(body["error"], "storage unavailable");
        assert_eq!(body["code"], "STORAGE_ERROR");
    }

    #[tokio::test]
    async fn disable_keeps_sender_verbatim() {
        let state = state_with(Some("should not reply"), None);
        let router = build_router(state.clone());

        let resp = router
            .clone()
            .oneshot(json_post("/admin/disable", r#"{"sender":" +1555"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(body["sender"], " +1555");

        let resp = router
            .oneshot(json_post("/bot", r#"{"From":" +1555","Body":"hello"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(state.pipeline.store.is_disabled(" +1555").unwrap());
        assert!(!state.pipeline.store.is_disabled("+1555").unwrap());
        assert!(state.pipeline.store.history(" +1555").unwrap().is_empty());
    }

    #[tokio::test]
    async fn whitespace_only_sender_is_rejected() {
        let state = state_with(Some("ok"), None);
        let resp = build_router(state)
            .oneshot(json_post("/admin/disable", r#"{"sender":"   "}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_persona_is_not_found() {
        let state = state_with(Some("ok"), None);
        let resp = build_router(state.clone())
            .oneshot(form_post("/bot/pirate", "From=%2B1555&Body=ahoy"))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(state.pipeline.store.history("+1555").unwrap().is_empty());
    }

    #[tokio::test]
    async fn admin_disable_requires_sender() {
        let state = state_with(Some("ok"), None);
        let resp = build_router(state)
            .oneshot(json_post("/admin/disable", "{}"))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn admin_disable_is_idempotent() {
        let state = state_with(Some("ok"), None);
        let router = build_router(state.clone());

        let first = router
            .clone()
            .oneshot(json_post("/admin/disable", r#"{"sender":"+1555"}"#))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_string(first).await).unwrap();
        assert_eq!(body["already_disabled"], false);

        let second = router
            .oneshot(form_post("/admin/disable", "sender=%2B1555"))
            .await
            .unwrap();
        let body: Value = serde_json::from_str(&body_string(second).await).unwrap();
        assert_eq!(body["ok"], true);
        assert_eq!(body["already_disabled"], true);
        assert!(state.pipeline.store.is_disabled("+1555").unwrap());
    }

    #[tokio::test]
    async fn admin_token_is_enforced_when_configured() {
        let state = state_with(Some("ok"), Some("s3cret"));
        let router = build_router(state.clone());

        let denied = router
            .clone()
            .oneshot(
                Request::post("/admin/disable")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::AUTHORIZATION, "Bearer wrong")
                    .body(Body::from(r#"{"sender":"+1555"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
        assert!(!state.pipeline.store.is_disabled("+1555").unwrap());

        let allowed = router
            .oneshot(
                Request::post("/admin/disable")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::AUTHORIZATION, "Bearer s3cret")
                    .body(Body::from(r#"{"sender":"+1555"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);
        assert!(state.pipeline.store.is_disabled("+1555").unwrap());
    }

    #[tokio::test]
    async fn admin_history_lists_turns_in_order() {
        let state = state_with(Some("reply"), None);
        let router = build_router(state.clone());
        router
            .clone()
            .oneshot(form_post("/bot", "From=%2B1555&Body=first"))
            .await
            .unwrap();

        let resp = router
            .oneshot(
                Request::get("/admin/history/+1555")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(body["disabled"], false);
        let turns = body["turns"].as_array().unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0]["content"], "first");
        assert_eq!(turns[0]["role"], "human");
        assert_eq!(turns[1]["role"], "assistant");
    }

    #[tokio::test]
    async fn health_reports_model_and_personas() {
        let state = state_with(Some("ok"), None);
        let resp = build_router(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body: Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["model"], "gpt-3.5-turbo-16k");
        assert_eq!(body["default_persona"], "sales");
        assert_eq!(body["personas"], serde_json::json!(["sales", "workout"]));
    }
}
