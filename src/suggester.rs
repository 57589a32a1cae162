use crate::config::Config;
use crate::context::SystemContext;
use crate::credentials::Credentials;
use crate::error::SageError;
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::providers::{Protocol, Provider};
use crate::sse;
use crate::stream::{chunk_words, TextStream};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use tracing::info;

const MAX_TOKENS: u32 = 1024;

/// Kind of command the user is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Shell,
    Git,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Shell => "shell",
            Target::Git => "git",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = SageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "shell" => Ok(Target::Shell),
            "git" => Ok(Target::Git),
            other => Err(SageError::Configuration(format!(
                "unknown target '{}' (expected shell or git)",
                other
            ))),
        }
    }
}

/// Context for asking the model to rework its previous answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub previous_command: String,
    /// What the user wants changed, if they said.
    pub notes: Option<String>,
}

#[async_trait]
pub trait Suggester: Send + Sync {
    /// Streams a command for `prompt`, optionally reworking an earlier one.
    async fn suggest(
        &self,
        target: Target,
        prompt: &str,
        revision: Option<&Revision>,
    ) -> Result<TextStream>;

    /// Streams a natural-language explanation of `command`.
    async fn explain(&self, command: &str) -> Result<TextStream>;
}

pub struct LlmSuggester {
    http: Box<dyn HttpClient>,
    provider: Provider,
    model: String,
    api_key: String,
    context: SystemContext,
}

pub struct MockSuggester;

impl LlmSuggester {
    pub fn new(
        http: Box<dyn HttpClient>,
        provider: Provider,
        model: impl Into<String>,
        api_key: impl Into<String>,
        context: SystemContext,
    ) -> Self {
        Self {
            http,
            provider,
            model: model.into(),
            api_key: api_key.into(),
            context,
        }
    }

    /// Builds a suggester for the configured provider.
    ///
    /// # Errors
    ///
    /// [`SageError::Configuration`] for an unknown provider and
    /// [`SageError::MissingApiKey`] when no key is stored or exported.
    pub fn from_config(
        config: &Config,
        credentials: &Credentials,
        context: SystemContext,
    ) -> Result<Self, SageError> {
        let provider = config.provider.parse::<Provider>()?;
        let api_key = credentials
            .resolve_api_key(provider, |key| std::env::var(key).ok())
            .ok_or_else(|| SageError::MissingApiKey {
                provider: provider.id().to_string(),
                env_var: provider.api_key_env().to_string(),
            })?;

        info!("Using provider '{}' with model '{}'", provider, config.model);
        Ok(Self::new(
            Box::new(ReqwestHttpClient::new()),
            provider,
            config.model.clone(),
            api_key,
            context,
        ))
    }

    fn suggest_system_prompt(&self, target: Target) -> String {
        let focus = match target {
            Target::Shell => format!(
                "a single {} command line that accomplishes the user's request",
                self.context.shell
            ),
            Target::Git => "a single git command line that accomplishes the user's request".to_string(),
        };
        format!(
            "You are a command-line expert. Reply with {}.\n\
             Environment: platform={}, arch={}, shell={}.\n\
             RULES:\n\
             - Output ONLY the command, no explanations, no Markdown, no code fences\n\
             - Prefer portable, commonly available tools\n\
             - Chain steps with the shell's operators if more than one step is needed",
            focus, self.context.platform, self.context.arch, self.context.shell
        )
    }

    fn explain_system_prompt(&self) -> String {
        format!(
            "You explain command lines to developers. The user's shell is {} on {}.\n\
             Explain what the given command does, part by part, in concise Markdown.\n\
             Mention anything destructive or irreversible it could do.",
            self.context.shell, self.context.platform
        )
    }

    fn build_body(&self, system: &str, user: &str) -> Value {
        match self.provider.protocol() {
            Protocol::OpenAiChat => json!({
                "model": self.model,
                "stream": true,
                "messages": [
                    { "role": "system", "content": system },
                    { "role": "user", "content": user }
                ]
            }),
            Protocol::AnthropicMessages => json!({
                "model": self.model,
                "max_tokens": MAX_TOKENS,
                "stream": true,
                "system": system,
                "messages": [
                    { "role": "user", "content": user }
                ]
            }),
        }
    }

    async fn stream_completion(&self, system: &str, user: &str) -> Result<TextStream> {
        let body = self.build_body(system, user);
        let headers = self.provider.auth_headers(&self.api_key);

        let response = self
            .http
            .post_json_stream(self.provider.endpoint(), &headers, &body)
            .await?;
        Ok(sse::text_stream(response, self.provider.protocol()))
    }
}

/// User message for a suggestion, with the previous attempt when revising.
pub fn build_user_prompt(prompt: &str, revision: Option<&Revision>) -> String {
    match revision {
        None => prompt.to_string(),
        Some(revision) => {
            let mut message = format!(
                "Original request: {}\n\nYour previous suggestion was:\n{}\n\n",
                prompt, revision.previous_command
            );
            match &revision.notes {
                Some(notes) => message.push_str(&format!(
                    "Revise the command according to this feedback: {}",
                    notes
                )),
                None => message.push_str("Suggest a better alternative command."),
            }
            message
        }
    }
}

#[async_trait]
impl Suggester for LlmSuggester {
    async fn suggest(
        &self,
        target: Target,
        prompt: &str,
        revision: Option<&Revision>,
    ) -> Result<TextStream> {
        info!("Requesting {} suggestion for: {}", target, prompt);
        let system = self.suggest_system_prompt(target);
        let user = build_user_prompt(prompt, revision);
        self.stream_completion(&system, &user).await
    }

    async fn explain(&self, command: &str) -> Result<TextStream> {
        info!("Requesting explanation for: {}", command);
        let system = self.explain_system_prompt();
        self.stream_completion(&system, command).await
    }
}

#[async_trait]
impl Suggester for MockSuggester {
    async fn suggest(
        &self,
        target: Target,
        prompt: &str,
        revision: Option<&Revision>,
    ) -> Result<TextStream> {
        Ok(chunk_words(&self.mock_suggest(target, prompt, revision)))
    }

    async fn explain(&self, command: &str) -> Result<TextStream> {
        Ok(chunk_words(&self.mock_explain(command)))
    }
}

impl MockSuggester {
    pub fn new() -> Self {
        Self
    }

    pub fn mock_suggest(&self, target: Target, prompt: &str, revision: Option<&Revision>) -> String {
        if let Some(revision) = revision {
            let note = revision.notes.as_deref().unwrap_or("revised");
            return format!("{} # {}", revision.previous_command, note);
        }

        let prompt = prompt.to_lowercase();
        match target {
            Target::Git => {
                if prompt.contains("branch") {
                    "git branch --all".to_string()
                } else if prompt.contains("undo") {
                    "git reset --soft HEAD~1".to_string()
                } else if prompt.contains("status") {
                    "git status --short".to_string()
                } else {
                    "git log --oneline -10".to_string()
                }
            }
            Target::Shell => {
                if prompt.contains("list") && prompt.contains("file") {
                    "ls -la".to_string()
                } else if prompt.contains("disk") {
                    "df -h".to_string()
                } else if prompt.contains("hello") || prompt.contains("greet") {
                    "echo hello".to_string()
                } else if prompt.contains("fail") {
                    "exit 3".to_string()
                } else {
                    let words: Vec<&str> = prompt.split_whitespace().take(3).collect();
                    format!("echo '{}'", words.join(" ").replace('\'', ""))
                }
            }
        }
    }

    pub fn mock_explain(&self, command: &str) -> String {
        format!(
            "`{}`\n\nThis is a mock explanation. The command runs as written in your shell.\n",
            command
        )
    }
}

impl Default for MockSuggester {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::tests::MockHttpClient;
    use futures::StreamExt;

    fn context() -> SystemContext {
        SystemContext {
            platform: "linux".to_string(),
            arch: "x86_64".to_string(),
            shell: "bash".to_string(),
        }
    }

    fn openai_event(text: &str) -> String {
        format!(
            "data: {}\n\n",
            json!({"choices": [{"delta": {"content": text}}]})
        )
    }

    async fn collect(stream: TextStream) -> String {
        stream.map(|f| f.unwrap()).collect::<Vec<_>>().await.concat()
    }

    #[test]
    fn test_parse_target() {
        assert_eq!("shell".parse::<Target>().unwrap(), Target::Shell);
        assert_eq!("git".parse::<Target>().unwrap(), Target::Git);
        assert!(matches!(
            "svn".parse::<Target>().unwrap_err(),
            SageError::Configuration(_)
        ));
    }

    #[test]
    fn test_user_prompt_without_revision_is_the_prompt() {
        assert_eq!(build_user_prompt("list files", None), "list files");
    }

    #[test]
    fn test_user_prompt_with_revision_includes_previous_command() {
        let revision = Revision {
            previous_command: "ls -la".to_string(),
            notes: Some("sort by size".to_string()),
        };
        let message = build_user_prompt("list files", Some(&revision));

        assert!(message.contains("list files"));
        assert!(message.contains("ls -la"));
        assert!(message.contains("sort by size"));
    }

    #[tokio::test]
    async fn test_llm_suggester_streams_openai_deltas() {
        let chunks = [openai_event("git "), openai_event("status"), "data: [DONE]\n\n".to_string()];
        let chunk_refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
        let suggester = LlmSuggester::new(
            Box::new(MockHttpClient::new(&chunk_refs)),
            Provider::OpenAi,
            "gpt-4o",
            "sk-test",
            context(),
        );

        let stream = suggester.suggest(Target::Git, "show status", None).await.unwrap();

        assert_eq!(collect(stream).await, "git status");
    }

    #[tokio::test]
    async fn test_openai_body_shape() {
        let http = MockHttpClient::new(&[]);
        let suggester = LlmSuggester::new(Box::new(http), Provider::GithubModels, "gpt-4o", "k", context());

        let body = suggester.build_body("sys", "user");

        assert_eq!(body["stream"], true);
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "user");
    }

    #[tokio::test]
    async fn test_anthropic_body_shape() {
        let http = MockHttpClient::new(&[]);
        let suggester = LlmSuggester::new(
            Box::new(http),
            Provider::Anthropic,
            "claude-3-5-haiku-latest",
            "k",
            context(),
        );

        let body = suggester.build_body("sys", "user");

        assert_eq!(body["system"], "sys");
        assert_eq!(body["max_tokens"], MAX_TOKENS);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_system_prompt_mentions_environment() {
        let suggester = LlmSuggester::new(
            Box::new(MockHttpClient::new(&[])),
            Provider::OpenAi,
            "gpt-4o",
            "k",
            context(),
        );

        let prompt = suggester.suggest_system_prompt(Target::Shell);

        assert!(prompt.contains("bash"));
        assert!(prompt.contains("linux"));
        assert!(suggester.suggest_system_prompt(Target::Git).contains("git"));
    }

    #[test]
    fn test_from_config_rejects_unknown_provider() {
        let config = Config {
            provider: "acme".to_string(),
            ..Config::default()
        };
        let err = LlmSuggester::from_config(&config, &Credentials::default(), context())
            .err()
            .unwrap();
        assert!(matches!(err, SageError::Configuration(_)));
    }

    #[test]
    fn test_from_config_uses_stored_key() {
        let config = Config {
            provider: "google".to_string(),
            ..Config::default()
        };
        let mut credentials = Credentials::default();
        credentials.set_api_key(Provider::Google, "stored-key".to_string());

        let suggester = LlmSuggester::from_config(&config, &credentials, context()).unwrap();

        assert_eq!(suggester.provider, Provider::Google);
        assert!(!suggester.api_key.is_empty());
    }

    #[tokio::test]
    async fn test_mock_suggester_is_deterministic() {
        let mock = MockSuggester::new();
        let first = collect(mock.suggest(Target::Shell, "list all files", None).await.unwrap()).await;
        let second = collect(mock.suggest(Target::Shell, "list all files", None).await.unwrap()).await;

        assert_eq!(first, "ls -la");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_mock_suggester_revision_builds_on_previous() {
        let mock = MockSuggester::new();
        let revision = Revision {
            previous_command: "df -h".to_string(),
            notes: None,
        };

        let revised = collect(mock.suggest(Target::Shell, "disk usage", Some(&revision)).await.unwrap()).await;

        assert_eq!(revised, "df -h # revised");
    }

    #[tokio::test]
    async fn test_mock_explain_mentions_command() {
        let mock = MockSuggester::new();
        let text = collect(mock.explain("git status --short").await.unwrap()).await;
        assert!(text.contains("git status --short"));
    }
}
