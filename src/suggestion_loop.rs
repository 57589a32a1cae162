//! The interactive suggestion loop.
//!
//! One invocation drives a sequence of rounds over a single
//! [`SuggestionState`]: obtain a candidate command, render it, pick an action,
//! apply it. The loop is an explicit state value plus a transition function;
//! every await inside a transition is raced against the caller's interrupt
//! future so Ctrl-C is honoured while streaming and while waiting for input.

use crate::action::ActionKind;
use crate::clipboard::Clipboard;
use crate::config::Config;
use crate::error::SageError;
use crate::executor::{ExitReport, ShellExecutor};
use crate::highlight::Highlighter;
use crate::prompt::Prompter;
use crate::renderer::StreamRenderer;
use crate::suggester::{Revision, Suggester, Target};
use crate::terminal::Terminal;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, info, warn};

/// Settings resolved once before the first round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    pub target: Target,
    /// When set, every round uses this action and no action prompt is shown.
    pub default_action: Option<ActionKind>,
}

impl LoopConfig {
    pub fn new(target: Target, default_action: Option<ActionKind>) -> Self {
        Self {
            target,
            default_action,
        }
    }

    /// Resolves the default action from `config`, letting a command-line
    /// value take precedence.
    ///
    /// # Errors
    ///
    /// [`SageError::Configuration`] if either value names no known action.
    pub fn from_config(
        config: &Config,
        target: Target,
        cli_default: Option<&str>,
    ) -> Result<Self, SageError> {
        let default_action = match cli_default {
            Some(value) => Some(value.parse::<ActionKind>()?),
            None => config.default_action()?,
        };
        if let Some(action) = default_action {
            info!("Default action '{}' applies to every round", action);
        }
        Ok(Self::new(target, default_action))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// No candidate yet.
    Awaiting,
    /// A candidate is on screen and an action is pending.
    Displayed,
    /// Asking the suggester to rework the current candidate.
    Revising,
    Done,
}

/// The mutable accumulator of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionState {
    /// The candidate as last rendered. Empty until a suggestion succeeds.
    pub command: String,
    /// False once Run or Cancel has been chosen, or the loop was interrupted.
    pub continue_loop: bool,
}

impl SuggestionState {
    fn new() -> Self {
        Self {
            command: String::new(),
            continue_loop: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The command ran; a non-zero exit is reported here, not as an error.
    Executed(ExitReport),
    /// Run was chosen but the shell could not be started.
    RunFailed(String),
    Cancelled,
    /// A default action was configured but no suggestion could be obtained,
    /// so there was nothing to apply it to.
    NoSuggestion,
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopReport {
    pub outcome: LoopOutcome,
    /// Number of actions applied.
    pub rounds: usize,
    pub state: SuggestionState,
}

impl LoopReport {
    pub fn final_command(&self) -> &str {
        &self.state.command
    }
}

/// Highlighting for the two kinds of rendered text.
pub struct Highlighters {
    pub command: Box<dyn Highlighter>,
    pub explanation: Box<dyn Highlighter>,
}

/// Bookkeeping carried between transitions.
struct Progress {
    state: SuggestionState,
    revision: Option<Revision>,
    rounds: usize,
    outcome: LoopOutcome,
}

pub struct SuggestionLoop<T: Terminal> {
    config: LoopConfig,
    suggester: Box<dyn Suggester>,
    renderer: StreamRenderer<T>,
    highlighters: Highlighters,
    prompter: Box<dyn Prompter>,
    clipboard: Box<dyn Clipboard>,
    executor: ShellExecutor,
}

impl<T: Terminal> SuggestionLoop<T> {
    pub fn new(
        config: LoopConfig,
        suggester: Box<dyn Suggester>,
        renderer: StreamRenderer<T>,
        highlighters: Highlighters,
        prompter: Box<dyn Prompter>,
        clipboard: Box<dyn Clipboard>,
        executor: ShellExecutor,
    ) -> Self {
        Self {
            config,
            suggester,
            renderer,
            highlighters,
            prompter,
            clipboard,
            executor,
        }
    }

    /// Runs rounds for `prompt` until Run, Cancel or `interrupt` resolves.
    ///
    /// Recoverable failures (a broken stream, an unavailable clipboard) are
    /// reported on the terminal and the loop carries on. An interrupt yields
    /// [`LoopOutcome::Interrupted`] rather than an error.
    ///
    /// # Errors
    ///
    /// Only fatal errors: the terminal or stdin became unusable.
    pub async fn run<I>(&mut self, prompt: &str, interrupt: I) -> Result<LoopReport, SageError>
    where
        I: Future<Output = ()>,
    {
        let mut interrupt = std::pin::pin!(interrupt);
        let mut progress = Progress {
            state: SuggestionState::new(),
            revision: None,
            rounds: 0,
            outcome: LoopOutcome::Cancelled,
        };
        let mut current = LoopState::Awaiting;

        while current != LoopState::Done {
            current = match self
                .transition(current, prompt, &mut progress, interrupt.as_mut())
                .await
            {
                Ok(next) => next,
                Err(SageError::Interrupted) => {
                    info!("Interrupted while {:?}", current);
                    progress.outcome = LoopOutcome::Interrupted;
                    progress.state.continue_loop = false;
                    LoopState::Done
                }
                Err(e) => return Err(e),
            };
        }

        Ok(LoopReport {
            outcome: progress.outcome,
            rounds: progress.rounds,
            state: progress.state,
        })
    }

    async fn transition<I>(
        &mut self,
        current: LoopState,
        prompt: &str,
        progress: &mut Progress,
        mut interrupt: Pin<&mut I>,
    ) -> Result<LoopState, SageError>
    where
        I: Future<Output = ()>,
    {
        match current {
            LoopState::Awaiting => {
                if let Some(command) = self.fetch_suggestion(prompt, None, interrupt).await? {
                    progress.state.command = command;
                }
                if progress.state.command.is_empty() && self.config.default_action.is_some() {
                    self.renderer
                        .notice("⚠️  No suggestion to apply the default action to")?;
                    progress.outcome = LoopOutcome::NoSuggestion;
                    progress.state.continue_loop = false;
                    return Ok(LoopState::Done);
                }
                Ok(LoopState::Displayed)
            }

            LoopState::Revising => {
                let revision = progress.revision.take();
                if let Some(command) = self
                    .fetch_suggestion(prompt, revision.as_ref(), interrupt)
                    .await?
                {
                    progress.state.command = command;
                }
                Ok(LoopState::Displayed)
            }

            LoopState::Displayed => {
                let action = match self.config.default_action {
                    // Copy and Explain may not await anything, so poll the
                    // interrupt here or a default-action loop never sees it.
                    Some(action) => {
                        interruptible(interrupt.as_mut(), tokio::task::yield_now()).await?;
                        action
                    }
                    None => interruptible(interrupt.as_mut(), self.prompter.choose_action())
                        .await?
                        .map_err(|source| SageError::Input { source })?,
                };
                progress.rounds += 1;
                info!("Round {}: {}", progress.rounds, action);

                if action != ActionKind::Cancel && progress.state.command.is_empty() {
                    self.renderer
                        .notice("⚠️  There is no command yet, asking again")?;
                    return Ok(LoopState::Awaiting);
                }

                progress.state.continue_loop = !action.is_terminal();
                match action {
                    ActionKind::Run => {
                        progress.outcome = self.run_command(&progress.state.command)?;
                        Ok(LoopState::Done)
                    }
                    ActionKind::Cancel => {
                        progress.outcome = LoopOutcome::Cancelled;
                        Ok(LoopState::Done)
                    }
                    ActionKind::Revise => {
                        let notes = match self.config.default_action {
                            Some(_) => None,
                            None => interruptible(interrupt, self.prompter.revision_notes())
                                .await?
                                .map_err(|source| SageError::Input { source })?,
                        };
                        progress.revision = Some(Revision {
                            previous_command: progress.state.command.clone(),
                            notes,
                        });
                        Ok(LoopState::Revising)
                    }
                    ActionKind::Explain => {
                        self.explain(&progress.state.command, interrupt).await?;
                        Ok(LoopState::Displayed)
                    }
                    ActionKind::Copy => {
                        self.copy(&progress.state.command)?;
                        Ok(LoopState::Displayed)
                    }
                }
            }

            LoopState::Done => Ok(LoopState::Done),
        }
    }

    /// Streams and renders a suggestion. `None` when it failed in a way the
    /// user can retry; the failure has already been reported.
    async fn fetch_suggestion<I>(
        &mut self,
        prompt: &str,
        revision: Option<&Revision>,
        mut interrupt: Pin<&mut I>,
    ) -> Result<Option<String>, SageError>
    where
        I: Future<Output = ()>,
    {
        let target = self.config.target;
        let rendered = match interruptible(
            interrupt.as_mut(),
            self.suggester.suggest(target, prompt, revision),
        )
        .await?
        {
            Ok(source) => {
                interruptible(
                    interrupt,
                    self.renderer.render(source, self.highlighters.command.as_ref()),
                )
                .await?
            }
            Err(e) => Err(SageError::stream(e)),
        };

        match rendered {
            Ok(text) => {
                self.renderer.notice("")?;
                let command = text.trim().to_string();
                debug!("Candidate command: {}", command);
                Ok(Some(command))
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                self.report(&e)?;
                Ok(None)
            }
        }
    }

    async fn explain<I>(&mut self, command: &str, mut interrupt: Pin<&mut I>) -> Result<(), SageError>
    where
        I: Future<Output = ()>,
    {
        self.renderer.notice("💡 Explanation:")?;
        let rendered = match interruptible(interrupt.as_mut(), self.suggester.explain(command)).await? {
            Ok(source) => {
                interruptible(
                    interrupt,
                    self.renderer
                        .render(source, self.highlighters.explanation.as_ref()),
                )
                .await?
            }
            Err(e) => Err(SageError::stream(e)),
        };

        match rendered {
            Ok(_) => self.renderer.notice(""),
            Err(e) if e.is_fatal() => Err(e),
            // Whatever streamed before the failure stays on screen.
            Err(e) => {
                self.renderer.notice("")?;
                self.report(&e)
            }
        }
    }

    fn copy(&mut self, command: &str) -> Result<(), SageError> {
        match self.clipboard.set_text(command) {
            Ok(()) => self.renderer.notice("📋 Copied to clipboard"),
            Err(e) => self.report(&SageError::ActionExecution {
                action: "copy".to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn run_command(&mut self, command: &str) -> Result<LoopOutcome, SageError> {
        self.renderer.notice(&format!("▶️  Running: {}", command))?;
        match self.executor.execute(command) {
            Ok(report) => {
                if report.success {
                    self.renderer.notice("✅ Command completed")?;
                } else {
                    let status = report
                        .code
                        .map(|code| code.to_string())
                        .unwrap_or_else(|| "a signal".to_string());
                    self.renderer
                        .notice(&format!("❌ Command exited with status {}", status))?;
                }
                Ok(LoopOutcome::Executed(report))
            }
            Err(e) => {
                let error = SageError::ActionExecution {
                    action: "run".to_string(),
                    message: e.to_string(),
                };
                self.report(&error)?;
                Ok(LoopOutcome::RunFailed(error.to_string()))
            }
        }
    }

    fn report(&mut self, error: &SageError) -> Result<(), SageError> {
        warn!("{}", error);
        self.renderer.notice(&format!("⚠️  {}", error))
    }
}

/// Awaits `fut` unless `interrupt` resolves first.
async fn interruptible<I, F>(interrupt: Pin<&mut I>, fut: F) -> Result<F::Output, SageError>
where
    I: Future<Output = ()>,
    F: Future,
{
    tokio::select! {
        biased;
        _ = interrupt => Err(SageError::Interrupted),
        output = fut => Ok(output),
    }
}
