use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use parley_agent::openai::OpenAiProvider;
use parley_agent::provider::{ChatRequest, ChatResponse};
use parley_agent::{CompletionClient, CompletionError, LlmProvider, PersonaTable, PipelineContext};
use parley_core::ParleyConfig;
use parley_store::ConversationStore;
use tracing::info;

mod app;
mod http;
mod twiml;

/// Webhook gateway for persona-driven chat replies.
#[derive(Debug, Parser)]
#[command(name = "parley-gateway", version, about)]
struct Cli {
    /// Config file path (default: ~/.parley/parley.toml).
    #[arg(long, env = "PARLEY_CONFIG")]
    config: Option<String>,

    /// Override `gateway.bind`.
    #[arg(long)]
    bind: Option<String>,

    /// Override `gateway.port`.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "parley_gateway=info,parley_agent=info,tower_http=debug".into()
            }),
        )
        .init();

    let cli = Cli::parse();

    // explicit path > PARLEY_CONFIG env > ~/.parley/parley.toml
    // A missing file yields defaults; a malformed one is fatal so that
    // `admin.token` is never silently dropped.
    let config = ParleyConfig::load(cli.config.as_deref())?;

    let bind = cli.bind.clone().unwrap_or_else(|| config.gateway.bind.clone());
    let port = cli.port.unwrap_or(config.gateway.port);

    let store = Arc::new(ConversationStore::open(&config.database.path)?);

    let personas = PersonaTable::from_config(&config)?;
    info!(
        default = %personas.default_persona().name,
        personas = ?personas.names().collect::<Vec<_>>(),
        "personas ready"
    );

    let provider = build_provider(&config)?;
    let completion = CompletionClient::new(
        provider,
        config.completion.model.clone(),
        config.completion.temperature,
    )
    .with_max_tokens(config.completion.max_tokens);
    info!(
        provider = %completion.provider_name(),
        model = %completion.model(),
        temperature = config.completion.temperature,
        "completion client ready"
    );

    let pipeline = PipelineContext::new(store, completion, personas);
    let state = Arc::new(app::AppState::new(config, pipeline));
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("Parley gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

/// OpenAI when a key is configured (TOML, `PARLEY_COMPLETION__API_KEY` or
/// `OPENAI_API_KEY`), otherwise a provider that fails every call.
fn build_provider(config: &ParleyConfig) -> anyhow::Result<Box<dyn LlmProvider>> {
    let completion = &config.completion;
    match completion.api_key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => {
            info!("LLM provider: OpenAI ({})", completion.base_url);
            let provider = OpenAiProvider::new(
                key.to_string(),
                Some(completion.base_url.clone()),
                Duration::from_secs(completion.timeout_secs),
            )?;
            Ok(Box::new(provider))
        }
        None => {
            tracing::warn!("No API key configured, every inbound message will get a 502");
            Ok(Box::new(NullProvider))
        }
    }
}

/// Placeholder provider when no API key is available.
struct NullProvider;

#[async_trait]
impl LlmProvider for NullProvider {
    fn name(&self) -> &str {
        "none"
    }

    async fn send(&self, _req: &ChatRequest) -> Result<ChatResponse, CompletionError> {
        Err(CompletionError::Unavailable(
            "no API key configured; set completion.api_key or OPENAI_API_KEY".to_string(),
        ))
    }
}
