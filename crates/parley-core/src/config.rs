use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::types::HistoryFilter;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-16k";
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_PERSONA: &str = "sales";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Top-level config (parley.toml + PARLEY_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParleyConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Extra or replacement personas. Built-ins stay available unless a
    /// config entry reuses their name.
    #[serde(default)]
    pub personas: Vec<PersonaConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Text-completion provider settings. Model and temperature are fixed for the
/// lifetime of the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// API key; falls back to `OPENAI_API_KEY` when unset.
    pub api_key: Option<String>,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Upper bound on generated tokens; provider default when `None`.
    pub max_tokens: Option<u32>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_base_url(),
            model: default_model(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Administrative endpoints. With no token configured they are open, so
/// bind to a private interface in that case.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Persona served by `POST /bot`.
    #[serde(default = "default_persona")]
    pub default_persona: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_persona: default_persona(),
        }
    }
}

/// A persona declared in config. Exactly one of `template` / `template_path`
/// must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    pub name: String,
    pub template: Option<String>,
    pub template_path: Option<String>,
    #[serde(default)]
    pub history_filter: HistoryFilter,
}

impl PersonaConfig {
    /// Resolve the template text, reading it from disk when given by path.
    pub fn load_template(&self) -> crate::error::Result<String> {
        match (&self.template, &self.template_path) {
            (Some(text), None) => Ok(text.clone()),
            (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
                crate::error::ParleyError::Persona {
                    persona: self.name.clone(),
                    reason: format!("cannot read template {path}: {e}"),
                }
            }),
            (Some(_), Some(_)) => Err(crate::error::ParleyError::Persona {
                persona: self.name.clone(),
                reason: "set either template or template_path, not both".to_string(),
            }),
            (None, None) => Err(crate::error::ParleyError::Persona {
                persona: self.name.clone(),
                reason: "missing template or template_path".to_string(),
            }),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_persona() -> String {
    DEFAULT_PERSONA.to_string()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.parley/parley.db", home)
}

impl ParleyConfig {
    /// Load config from a TOML file with PARLEY_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g. `PARLEY_COMPLETION__API_KEY`.
    /// A missing file is not an error: every section has defaults.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);
        tracing::debug!(path = %path, "loading config");

        Self::figment(&path)
            .extract::<ParleyConfig>()
            .map(|mut config| {
                if config.completion.api_key.is_none() {
                    config.completion.api_key = std::env::var("OPENAI_API_KEY").ok();
                }
                config
            })
            .map_err(|e| crate::error::ParleyError::Config(e.to_string()))
    }

    fn figment(path: &str) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("PARLEY_").split("__"))
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.parley/parley.toml", home)
}
