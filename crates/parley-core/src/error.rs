use thiserror::Error;

/// Startup and configuration failures shared across the workspace.
#[derive(Debug, Error)]
pub enum ParleyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Persona error ({persona}): {reason}")]
    Persona { persona: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ParleyError>;
