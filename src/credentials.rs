//! Provider API keys, kept apart from the shareable config file.
//!
//! The credentials file is private: it is written with mode `0600` and a file
//! found with looser permissions is tightened before it is read.

use crate::config::Config;
use crate::providers::Provider;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const CREDENTIALS_MODE: u32 = 0o600;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    keys: BTreeMap<String, String>,
}

impl Credentials {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_credentials_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        ensure_permissions(path, CREDENTIALS_MODE)?;
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| anyhow!("Invalid credentials file {}: {}", path.display(), e))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_credentials_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        set_permissions(path, CREDENTIALS_MODE)?;
        info!("Saved credentials to: {}", path.display());
        Ok(())
    }

    pub fn get_credentials_path() -> Result<PathBuf> {
        Ok(Config::get_state_dir()?.join("credentials.toml"))
    }

    pub fn api_key(&self, provider: Provider) -> Option<&str> {
        self.keys.get(provider.id()).map(String::as_str)
    }

    pub fn set_api_key(&mut self, provider: Provider, api_key: String) {
        self.keys.insert(provider.id().to_string(), api_key);
    }

    /// Environment variable first, then the stored key.
    pub fn resolve_api_key(
        &self,
        provider: Provider,
        var: impl Fn(&str) -> Option<String>,
    ) -> Option<String> {
        var(provider.api_key_env())
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.api_key(provider).map(str::to_string))
    }
}

#[cfg(unix)]
fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn ensure_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let current = fs::metadata(path)?.permissions().mode() & 0o777;
    if current != mode {
        warn!(
            "Credentials file {} had mode {:o}, tightening to {:o}",
            path.display(),
            current,
            mode
        );
        set_permissions(path, mode)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
