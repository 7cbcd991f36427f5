use std::time::Instant;

use tracing::info;

use crate::provider::{ChatRequest, ChatRole, CompletionError, LlmProvider, Message};

/// Single-turn completion client: fixed model and temperature in front of a
/// provider. Shared across requests; holds no mutable state.
pub struct CompletionClient {
    provider: Box<dyn LlmProvider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl CompletionClient {
    pub fn new(provider: Box<dyn LlmProvider>, model: String, temperature: f32) -> Self {
        Self {
            provider,
            model,
            temperature,
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Send the assembled prompt and return the generated text.
    ///
    /// A blank reply is reported as `CompletionError::EmptyReply` so that
    /// nothing empty is ever logged as an assistant turn.
    pub async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let req = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: ChatRole::User,
                content: prompt.to_string(),
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let started = Instant::now();
        let resp = self.provider.send(&req).await?;
        info!(
            provider = %self.provider.name(),
            model = %resp.model,
            tokens_in = resp.tokens_in,
            tokens_out = resp.tokens_out,
            stop_reason = %resp.stop_reason,
            latency_ms = started.elapsed().as_millis() as u64,
            "completion received"
        );

        if resp.content.trim().is_empty() {
            return Err(CompletionError::EmptyReply);
        }
        Ok(resp.content)
    }
}
