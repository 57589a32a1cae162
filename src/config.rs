use crate::action::ActionKind;
use crate::credentials::Credentials;
use crate::error::SageError;
use crate::providers::Provider;
use anyhow::{anyhow, Result};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_PROVIDER: &str = "github-models";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_THEME: &str = "base16-ocean.dark";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Action applied to every round without prompting.
    #[serde(default)]
    pub default_action: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default = "default_highlight")]
    pub highlight: bool,
    #[serde(default, skip_serializing)]
    pub use_mock: bool,
}

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_highlight() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            default_action: None,
            theme: None,
            highlight: true,
            use_mock: false,
        }
    }
}

impl Config {
    /// Load configuration from file, environment variables, or create default
    pub fn load() -> Result<Self> {
        let mut config = match Self::load_from_file()? {
            Some(config) => config,
            None => {
                info!("No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Environment variables override the config file.
    pub fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(provider) = var("CMD_SAGE_PROVIDER") {
            self.provider = provider;
        }
        if let Some(model) = var("CMD_SAGE_MODEL") {
            self.model = model;
        }
        if let Some(action) = var("CMD_SAGE_DEFAULT_ACTION") {
            self.default_action = Some(action);
        }
        if var("CMD_SAGE_USE_MOCK").is_some() {
            self.use_mock = true;
        }
    }

    fn load_from_file() -> Result<Option<Self>> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Option<Self>> {
        if !config_path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(config_path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Invalid config file {}: {}", config_path.display(), e))?;
        info!("Loaded config from: {}", config_path.display());
        Ok(Some(config))
    }

    /// Records the provider (and optionally the model) in the config file.
    ///
    /// Starts from the file as saved, not from [`Config::load`], so
    /// environment overrides of this invocation are never persisted.
    pub fn remember_provider(provider: Provider, model: Option<&str>) -> Result<Self> {
        let config_path = Self::get_config_path()?;
        let mut config = Self::load_from(&config_path)?.unwrap_or_default();
        config.set_provider(provider, model);
        config.save_to(&config_path)?;
        Ok(config)
    }

    pub fn set_provider(&mut self, provider: Provider, model: Option<&str>) {
        self.provider = provider.id().to_string();
        if let Some(model) = model {
            self.model = model.to_string();
        }
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(config_path, content)?;
        info!("Saved config to: {}", config_path.display());
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        Ok(Self::get_config_dir()?.join("config.toml"))
    }

    pub fn get_config_dir() -> Result<PathBuf> {
        let home = home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
        Ok(home.join(".config").join("cmd-sage"))
    }

    /// Directory holding credentials and other private state.
    pub fn get_state_dir() -> Result<PathBuf> {
        let home = home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
        Ok(home.join(".local").join("state").join("cmd-sage"))
    }

    pub fn provider(&self) -> Result<Provider> {
        Ok(self.provider.parse::<Provider>()?)
    }

    /// Validates the configured default action.
    ///
    /// A present but unrecognized value is an error; it never silently falls
    /// back to interactive prompting.
    pub fn default_action(&self) -> std::result::Result<Option<ActionKind>, SageError> {
        match &self.default_action {
            Some(value) if !value.trim().is_empty() => value.parse::<ActionKind>().map(Some),
            _ => Ok(None),
        }
    }

    pub fn theme(&self) -> &str {
        self.theme.as_deref().unwrap_or(DEFAULT_THEME)
    }

    pub fn is_mock_mode(&self) -> bool {
        self.use_mock
    }

    pub fn show_config_info() -> Result<()> {
        let config_path = Self::get_config_path()?;
        println!("Configuration file: {}", config_path.display());

        let config = match Self::load_from_file()? {
            Some(config) => {
                println!("Status: Found");
                config
            }
            None => {
                println!("Status: Not found (using defaults)");
                Self::default()
            }
        };

        println!("Provider: {}", config.provider);
        println!("Model: {}", config.model);
        println!(
            "Default action: {}",
            config.default_action.as_deref().unwrap_or("none (prompt every round)")
        );
        println!("Theme: {}", config.theme());

        let credentials = Credentials::load()?;
        for provider in Provider::ALL {
            let status = if credentials.api_key(provider).is_some() {
                "Set"
            } else {
                "Not set"
            };
            println!("API key ({}): {}", provider, status);
        }

        println!("\nTo set an API key:");
        println!("  cmd-sage --set-api-key <your-key> --provider <provider>");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.provider, "github-models");
        assert_eq!(config.model, "gpt-4o");
        assert!(config.highlight);
        assert_eq!(config.theme(), DEFAULT_THEME);
        assert!(config.default_action().unwrap().is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str("default_action = \"copy\"\n").unwrap();
        assert_eq!(config.provider, DEFAULT_PROVIDER);
        assert_eq!(config.default_action().unwrap(), Some(ActionKind::Copy));
    }

    #[test]
    fn test_invalid_default_action_is_an_error() {
        let config = Config {
            default_action: Some("yolo".to_string()),
            ..Config::default()
        };
        assert!(config.default_action().is_err());
    }

    #[test]
    fn test_blank_default_action_means_prompt() {
        let config = Config {
            default_action: Some("  ".to_string()),
            ..Config::default()
        };
        assert!(config.default_action().unwrap().is_none());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env_overrides(env(&[
            ("CMD_SAGE_PROVIDER", "anthropic"),
            ("CMD_SAGE_DEFAULT_ACTION", "cancel"),
            ("CMD_SAGE_USE_MOCK", "1"),
        ]));

        assert_eq!(config.provider().unwrap(), Provider::Anthropic);
        assert_eq!(config.default_action().unwrap(), Some(ActionKind::Cancel));
        assert!(config.is_mock_mode());
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_saved_provider_and_model_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cmd-sage").join("config.toml");

        let mut config = Config {
            default_action: Some("copy".to_string()),
            ..Config::default()
        };
        config.set_provider(Provider::Anthropic, Some("claude-3-5-haiku-latest"));
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap().unwrap();
        assert_eq!(loaded.provider().unwrap(), Provider::Anthropic);
        assert_eq!(loaded.model, "claude-3-5-haiku-latest");
        assert_eq!(loaded.default_action().unwrap(), Some(ActionKind::Copy));
    }

    #[test]
    fn test_set_provider_keeps_model_when_not_given() {
        let mut config = Config::default();
        config.set_provider(Provider::Google, None);
        assert_eq!(config.provider, "google");
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_load_from_missing_file_is_none() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(Config::load_from(&dir.path().join("config.toml")).unwrap().is_none());
    }

    #[test]
    fn test_mock_flag_is_not_persisted() {
        let config = Config {
            use_mock: true,
            ..Config::default()
        };
        let serialized = toml::to_string_pretty(&config).unwrap();
        assert!(!serialized.contains("use_mock"));
    }
}
