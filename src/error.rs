//! Error kinds the suggestion loop has to tell apart.
//!
//! Most plumbing uses `anyhow::Result`; these variants exist where the loop
//! decides between recovering at a round boundary and aborting the invocation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SageError {
    /// The incremental text source failed before it was exhausted.
    #[error("failed to consume text stream: {source}")]
    StreamConsumption {
        #[source]
        source: anyhow::Error,
    },

    /// An action could not be carried out (clipboard missing, shell spawn failure, ...).
    #[error("{action} failed: {message}")]
    ActionExecution { action: String, message: String },

    /// Invalid configuration detected before the first round.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(
        "no API key configured for provider '{provider}'. Set it with `cmd-sage --set-api-key <KEY> --provider {provider}` or export {env_var}"
    )]
    MissingApiKey { provider: String, env_var: String },

    /// Interactive input could not be read.
    #[error("failed to read input: {source}")]
    Input {
        #[source]
        source: anyhow::Error,
    },

    /// Standard output could not be written.
    #[error("terminal write failed: {0}")]
    Terminal(#[from] std::io::Error),

    /// The user sent an interrupt while the loop was suspended.
    #[error("operation cancelled by user")]
    Interrupted,
}

impl SageError {
    pub fn stream(source: impl Into<anyhow::Error>) -> Self {
        Self::StreamConsumption {
            source: source.into(),
        }
    }

    /// Errors that must end the invocation instead of the current round.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::MissingApiKey { .. }
                | Self::Input { .. }
                | Self::Terminal(_)
                | Self::Interrupted
        )
    }
}
