use anyhow::Result;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Helper to run cmd-sage in mock mode with an isolated home directory
fn run_sage(home: &Path, args: &[&str], stdin: &str, envs: &[(&str, &str)]) -> Result<Output> {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_cmd-sage"));
    cmd.args(args);

    for var in [
        "CMD_SAGE_PROVIDER",
        "CMD_SAGE_MODEL",
        "CMD_SAGE_DEFAULT_ACTION",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    // Enable mock mode for deterministic testing
    cmd.env("CMD_SAGE_USE_MOCK", "1");
    cmd.env("HOME", home);
    cmd.env("SHELL", "/bin/sh");
    cmd.envs(envs.iter().copied());

    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = cmd.spawn()?;
    if let Some(mut input) = child.stdin.take() {
        input.write_all(stdin.as_bytes())?;
    }
    Ok(child.wait_with_output()?)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

// =============================================================================
// Default action
// =============================================================================

#[test]
fn test_default_run_executes_suggestion() -> Result<()> {
    let home = TempDir::new()?;
    let output = run_sage(
        home.path(),
        &["--no-highlight", "--default-action", "run", "say", "hello"],
        "",
        &[],
    )?;

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout = stdout(&output);
    assert!(stdout.contains("echo hello"), "Should show the suggestion");
    assert!(stdout.contains("Running: echo hello"));
    assert!(stdout.lines().any(|line| line == "hello"), "Should show command output");

    Ok(())
}

#[test]
fn test_failing_command_exit_code_is_propagated() -> Result<()> {
    let home = TempDir::new()?;
    let output = run_sage(home.path(), &["--no-highlight", "make", "it", "fail"], "", &[
        ("CMD_SAGE_DEFAULT_ACTION", "run"),
    ])?;

    assert_eq!(output.status.code(), Some(3));
    assert!(stdout(&output).contains("Command exited with status 3"));

    Ok(())
}

#[test]
fn test_default_cancel_never_runs() -> Result<()> {
    let home = TempDir::new()?;
    let output = run_sage(home.path(), &["-t", "git", "show", "status"], "", &[
        ("CMD_SAGE_DEFAULT_ACTION", "cancel"),
    ])?;

    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("git"), "Should show the suggestion");
    assert!(!stdout.contains("Running:"));

    Ok(())
}

#[test]
fn test_invalid_default_action_is_fatal() -> Result<()> {
    let home = TempDir::new()?;
    let output = run_sage(home.path(), &["say", "hello"], "1\n", &[
        ("CMD_SAGE_DEFAULT_ACTION", "launch"),
    ])?;

    assert!(!output.status.success());
    assert!(stderr(&output).contains("configuration error"));
    assert!(!stdout(&output).contains("echo hello"), "No round should start");

    Ok(())
}

// =============================================================================
// Interactive rounds
// =============================================================================

#[test]
fn test_revise_then_run_interactively() -> Result<()> {
    let home = TempDir::new()?;
    let output = run_sage(
        home.path(),
        &["--no-highlight", "say", "hello"],
        "2\nshout it\n1\n",
        &[],
    )?;

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout = stdout(&output);
    assert!(stdout.contains("echo hello # shout it"));
    assert!(stdout.contains("Running: echo hello # shout it"));

    Ok(())
}

#[test]
fn test_closed_stdin_cancels() -> Result<()> {
    let home = TempDir::new()?;
    let output = run_sage(home.path(), &["--no-highlight", "say", "hello"], "", &[])?;

    assert!(output.status.success());
    assert!(!stdout(&output).contains("Running:"));

    Ok(())
}

#[test]
fn test_prompt_read_from_stdin_when_missing() -> Result<()> {
    let home = TempDir::new()?;
    let output = run_sage(home.path(), &["--no-highlight"], "check disk space\n5\n", &[])?;

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout = stdout(&output);
    assert!(stdout.contains("What shell command would you like?"));
    assert!(stdout.contains("df -h"));

    Ok(())
}

#[test]
fn test_highlighted_output_still_contains_command() -> Result<()> {
    let home = TempDir::new()?;
    let output = run_sage(home.path(), &["list", "my", "files"], "", &[
        ("CMD_SAGE_DEFAULT_ACTION", "cancel"),
    ])?;

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("\x1b["), "Highlighted copy should be appended");

    Ok(())
}

// =============================================================================
// Configuration commands
// =============================================================================

#[test]
fn test_show_config() -> Result<()> {
    let home = TempDir::new()?;
    let output = run_sage(home.path(), &["--config"], "", &[])?;

    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("Configuration file:"));
    assert!(stdout.contains("Status: Not found (using defaults)"));
    assert!(stdout.contains("API key (anthropic): Not set"));

    Ok(())
}

#[test]
fn test_set_api_key_is_private() -> Result<()> {
    let home = TempDir::new()?;
    let output = run_sage(
        home.path(),
        &["--set-api-key", "sk-test", "--provider", "anthropic"],
        "",
        &[],
    )?;

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let path = home
        .path()
        .join(".local/state/cmd-sage/credentials.toml");
    let content = std::fs::read_to_string(&path)?;
    assert!(content.contains("sk-test"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path)?.permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    let output = run_sage(home.path(), &["--config"], "", &[])?;
    assert!(stdout(&output).contains("API key (anthropic): Set"));

    Ok(())
}

#[test]
fn test_set_api_key_saves_provider_and_model() -> Result<()> {
    let home = TempDir::new()?;
    let output = run_sage(
        home.path(),
        &[
            "--set-api-key",
            "sk-test",
            "--provider",
            "anthropic",
            "--model",
            "claude-3-5-haiku-latest",
        ],
        "",
        &[("CMD_SAGE_DEFAULT_ACTION", "copy")],
    )?;

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let config = std::fs::read_to_string(home.path().join(".config/cmd-sage/config.toml"))?;
    assert!(config.contains("provider = \"anthropic\""));
    assert!(config.contains("model = \"claude-3-5-haiku-latest\""));
    assert!(!config.contains("copy"), "Environment overrides must not be saved");

    let output = run_sage(home.path(), &["--config"], "", &[])?;
    let stdout = stdout(&output);
    assert!(stdout.contains("Status: Found"));
    assert!(stdout.contains("Provider: anthropic"));
    assert!(stdout.contains("Model: claude-3-5-haiku-latest"));

    Ok(())
}

#[test]
fn test_set_api_key_without_provider_leaves_config_alone() -> Result<()> {
    let home = TempDir::new()?;
    let output = run_sage(home.path(), &["--set-api-key", "gh-token"], "", &[])?;

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(!home.path().join(".config/cmd-sage/config.toml").exists());

    Ok(())
}
