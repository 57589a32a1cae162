//! Supported language model providers.
//!
//! Each provider knows its chat endpoint, how it authenticates and which
//! environment variable carries its API key. Anthropic speaks the Messages
//! streaming protocol; everything else is reached through an
//! OpenAI-compatible chat completions endpoint.

use crate::error::SageError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAi,
    Anthropic,
    Google,
    GithubModels,
}

/// Wire protocol spoken by a provider's streaming endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    OpenAiChat,
    AnthropicMessages,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::OpenAi,
        Provider::Anthropic,
        Provider::Google,
        Provider::GithubModels,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Google => "google",
            Provider::GithubModels => "github-models",
        }
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            Provider::Anthropic => Protocol::AnthropicMessages,
            _ => Protocol::OpenAiChat,
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1/chat/completions",
            Provider::Anthropic => "https://api.anthropic.com/v1/messages",
            Provider::Google => {
                "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
            }
            Provider::GithubModels => "https://models.github.ai/inference/chat/completions",
        }
    }

    /// Environment variable consulted for this provider's API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::Google => "GOOGLE_API_KEY",
            Provider::GithubModels => "GITHUB_TOKEN",
        }
    }

    /// Headers that authenticate a request with the given key.
    pub fn auth_headers(&self, api_key: &str) -> Vec<(&'static str, String)> {
        match self.protocol() {
            Protocol::AnthropicMessages => vec![
                ("x-api-key", api_key.to_string()),
                ("anthropic-version", "2023-06-01".to_string()),
            ],
            Protocol::OpenAiChat => vec![("authorization", format!("Bearer {}", api_key))],
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Provider {
    type Err = SageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|p| p.id() == s.trim())
            .ok_or_else(|| SageError::Configuration(format!("unknown provider '{}'", s)))
    }
}
