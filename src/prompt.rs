//! Interactive input: the action menu, revision notes and the initial request.
//!
//! All reading and writing goes through `*_with_io` methods that take any
//! `BufRead`/`Write` pair, so the dialogs can be exercised with in-memory
//! buffers. [`StdioPrompter`] wires them to the real stdin/stdout on a
//! blocking thread, which keeps the async loop free to notice an interrupt
//! while the user is still typing.

use crate::action::ActionKind;
use crate::suggester::Target;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::io::{self, BufRead, Write};
use tracing::info;

/// Source of interactive decisions for the suggestion loop.
#[async_trait]
pub trait Prompter: Send {
    /// Asks which action to take on the displayed command.
    async fn choose_action(&mut self) -> Result<ActionKind>;

    /// Asks what should change in a revision. `None` when the user skips.
    async fn revision_notes(&mut self) -> Result<Option<String>>;
}

/// The menus and questions, independent of where input comes from.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionPrompt;

impl ActionPrompt {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    // Core methods with I/O injection (testable)
    // =========================================================================

    /// Shows the action menu and reads a choice.
    ///
    /// Accepts the menu number or the action name. Invalid
    /// input re-asks; end of input counts as Cancel so a closed stdin never
    /// runs anything.
    pub fn prompt_for_action_with_io<R: BufRead, W: Write>(
        &self,
        input: &mut R,
        output: &mut W,
    ) -> Result<ActionKind> {
        let menu: Vec<String> = ActionKind::ALL
            .iter()
            .enumerate()
            .map(|(i, action)| format!("{}) {}", i + 1, action.title()))
            .collect();

        loop {
            write!(output, "\n{}\nWhat would you like to do? ", menu.join("  "))?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                writeln!(output)?;
                info!("Input closed at action prompt, cancelling");
                return Ok(ActionKind::Cancel);
            }

            match parse_choice(line.trim()) {
                Some(action) => {
                    info!("User chose '{}'", action);
                    return Ok(action);
                }
                None => {
                    writeln!(output, "Invalid choice. Please enter 1-5 or an action name.")?;
                }
            }
        }
    }

    /// Asks what to change in the next suggestion. Blank input means "just try again".
    pub fn prompt_for_revision_with_io<R: BufRead, W: Write>(
        &self,
        input: &mut R,
        output: &mut W,
    ) -> Result<Option<String>> {
        write!(output, "How should the command be revised? (Enter to just retry) ")?;
        output.flush()?;

        let mut line = String::new();
        input.read_line(&mut line)?;
        let notes = line.trim();
        Ok((!notes.is_empty()).then(|| notes.to_string()))
    }

    /// Asks for the natural-language request when none was given on the command line.
    ///
    /// # Errors
    ///
    /// Returns an error if input ends before a non-empty request was entered.
    pub fn prompt_for_request_with_io<R: BufRead, W: Write>(
        &self,
        target: Target,
        input: &mut R,
        output: &mut W,
    ) -> Result<String> {
        loop {
            write!(output, "What {} command would you like? ", target)?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                return Err(anyhow!("No request provided"));
            }
            let request = line.trim();
            if !request.is_empty() {
                return Ok(request.to_string());
            }
            writeln!(output, "Prompt cannot be empty")?;
        }
    }

    // =========================================================================
    // Convenience methods using standard I/O
    // =========================================================================

    pub fn prompt_for_request(&self, target: Target) -> Result<String> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stdout();
        self.prompt_for_request_with_io(target, &mut input, &mut output)
    }
}

fn parse_choice(choice: &str) -> Option<ActionKind> {
    if let Ok(index) = choice.parse::<usize>() {
        return index
            .checked_sub(1)
            .and_then(|i| ActionKind::ALL.get(i))
            .copied();
    }
    let choice = choice.to_ascii_lowercase();
    ActionKind::ALL
        .into_iter()
        .find(|action| action.as_str() == choice)
}

/// [`Prompter`] over the process's stdin and stdout.
///
/// Each read runs on a blocking thread holding the stdin lock. If the caller
/// stops awaiting (an interrupt won the race) that thread stays parked in
/// `read_line` with the lock held until a line or end of input arrives, so
/// later stdin reads in the same process block behind it. The binary exits
/// right after an interrupt; library callers that keep running should not
/// read stdin again.
#[derive(Debug, Default)]
pub struct StdioPrompter;

impl StdioPrompter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Prompter for StdioPrompter {
    async fn choose_action(&mut self) -> Result<ActionKind> {
        tokio::task::spawn_blocking(|| {
            let stdin = io::stdin();
            let mut input = stdin.lock();
            let mut output = io::stdout();
            ActionPrompt::new().prompt_for_action_with_io(&mut input, &mut output)
        })
        .await
        .map_err(|e| anyhow!("action prompt did not complete: {}", e))?
    }

    async fn revision_notes(&mut self) -> Result<Option<String>> {
        tokio::task::spawn_blocking(|| {
            let stdin = io::stdin();
            let mut input = stdin.lock();
            let mut output = io::stdout();
            ActionPrompt::new().prompt_for_revision_with_io(&mut input, &mut output)
        })
        .await
        .map_err(|e| anyhow!("revision prompt did not complete: {}", e))?
    }
}
