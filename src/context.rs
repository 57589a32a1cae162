//! Facts about the user's machine that shape a suggestion.
//!
//! The context is gathered once per invocation and embedded in the system
//! prompt; the detected shell is also the one the Run action executes in.

use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemContext {
    pub platform: String,
    pub arch: String,
    pub shell: String,
}

impl SystemContext {
    pub fn gather() -> Self {
        Self::gather_with(|key| std::env::var(key).ok())
    }

    pub fn gather_with(var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            platform: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            shell: detect_shell(std::env::consts::OS, var),
        }
    }
}

/// Works out the name of the user's interactive shell from the environment.
pub fn detect_shell(os: &str, var: impl Fn(&str) -> Option<String>) -> String {
    if os == "windows" {
        if var("PSModulePath").is_some() {
            return "powershell".to_string();
        }
        return var("COMSPEC")
            .or_else(|| var("ComSpec"))
            .and_then(|comspec| basename(&comspec.replace('\\', "/")))
            .unwrap_or_else(|| "cmd".to_string());
    }

    if var("ZSH_NAME").is_some() || var("ZSH_VERSION").is_some() {
        return "zsh".to_string();
    }
    if var("BASH_VERSION").is_some() {
        return "bash".to_string();
    }
    if var("FISH_VERSION").is_some() {
        return "fish".to_string();
    }

    let shell = var("SHELL").unwrap_or_else(|| "/bin/sh".to_string());
    basename(&shell).unwrap_or_else(|| "sh".to_string())
}

fn basename(path: &str) -> Option<String> {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
}
