//! Runs the accepted command in the user's shell.
//!
//! The command is handed to the shell verbatim with inherited standard
//! streams, so interactive programs (pagers, editors, prompts) behave as if
//! the user had typed the command themselves.

use anyhow::{anyhow, Result};
use std::process::{Command, ExitStatus};
use tracing::{info, warn};

/// Outcome of running a command.
///
/// A non-zero exit is a reported outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitReport {
    pub success: bool,
    /// Exit code, absent when the process was killed by a signal.
    pub code: Option<i32>,
}

impl From<ExitStatus> for ExitReport {
    fn from(status: ExitStatus) -> Self {
        Self {
            success: status.success(),
            code: status.code(),
        }
    }
}

// =============================================================================
// Traits for Dependency Injection
// =============================================================================

/// Trait for running system processes.
///
/// This abstraction enables testing without spawning real processes.
pub trait ProcessRunner: Send + Sync {
    /// Runs `program` with `args`, inheriting stdio, and waits for it.
    fn run_inherited(&self, program: &str, args: &[&str]) -> Result<ExitStatus>;

    /// Checks if a program exists in PATH.
    fn program_exists(&self, program: &str) -> bool;
}

/// Default process runner using std::process::Command.
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run_inherited(&self, program: &str, args: &[&str]) -> Result<ExitStatus> {
        Command::new(program)
            .args(args)
            .status()
            .map_err(|e| anyhow!("failed to start '{}': {}", program, e))
    }

    fn program_exists(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

// =============================================================================
// Executor Implementation
// =============================================================================

pub struct ShellExecutor {
    shell: String,
    runner: Box<dyn ProcessRunner>,
}

impl ShellExecutor {
    /// Creates an executor for the named shell (as reported by
    /// [`crate::context::detect_shell`]).
    pub fn new(shell: impl Into<String>) -> Self {
        Self::with_runner(shell, Box::new(SystemProcessRunner))
    }

    pub fn with_runner(shell: impl Into<String>, runner: Box<dyn ProcessRunner>) -> Self {
        Self {
            shell: shell.into(),
            runner,
        }
    }

    /// Executes `command` and reports how it exited.
    ///
    /// # Errors
    ///
    /// Returns an error if the command is blank or the shell cannot be started.
    pub fn execute(&self, command: &str) -> Result<ExitReport> {
        let command = command.trim();
        if command.is_empty() {
            return Err(anyhow!("No command provided"));
        }

        let shell = self.resolve_shell();
        let args = shell_args(&shell, command);
        info!("Executing in {}: {}", shell, command);

        let status = self.runner.run_inherited(&shell, &args)?;
        let report = ExitReport::from(status);
        if !report.success {
            warn!("Command exited with status {:?}", report.code);
        }
        Ok(report)
    }

    /// The detected shell if it can be found, otherwise the platform default.
    fn resolve_shell(&self) -> String {
        if self.runner.program_exists(&self.shell) {
            return self.shell.clone();
        }
        let fallback = if cfg!(windows) { "cmd" } else { "sh" };
        warn!("Shell '{}' not found in PATH, falling back to {}", self.shell, fallback);
        fallback.to_string()
    }
}

/// Arguments that make `shell` run `command` and exit.
fn shell_args<'a>(shell: &str, command: &'a str) -> Vec<&'a str> {
    let name = shell.to_ascii_lowercase();
    let name = name.trim_end_matches(".exe");
    match name {
        "powershell" | "pwsh" => vec!["-NoProfile", "-Command", command],
        "cmd" => vec!["/C", command],
        _ => vec!["-c", command],
    }
}
