//! cmd-sage - turn natural-language requests into shell and git commands.
//!
//! A language model suggests a command, the suggestion is streamed to the
//! terminal as it arrives and then redrawn with syntax highlighting, and the
//! user decides what to do with it:
//!
//! - **Run** it in their shell
//! - **Revise** it, optionally saying what should change
//! - **Explain** it in plain language
//! - **Copy** it to the clipboard
//! - **Cancel**
//!
//! # Architecture
//!
//! - [`suggestion_loop`] - The round-by-round state machine
//! - [`renderer`] - Streams text and swaps it for its highlighted form in place
//! - [`terminal`] - Narrow cursor/write interface over stdout
//! - [`highlight`] - Syntax highlighting for commands and explanations
//! - [`suggester`] - Model-backed and mock command suggestion
//! - [`sse`] - Server-sent event decoding for streamed completions
//! - [`stream`] - The fragment stream type shared by suggesters and the renderer
//! - [`providers`] - Supported model providers and their wire protocols
//! - [`http_client`] - HTTP client abstraction
//! - [`prompt`] - Action menu and other interactive input
//! - [`executor`] - Runs the accepted command in the user's shell
//! - [`clipboard`] - System clipboard access
//! - [`config`] / [`credentials`] - Preferences and API keys
//! - [`context`] - Platform and shell detection
//! - [`action`] / [`error`] - Shared vocabulary
//!
//! # Example
//!
//! ```ignore
//! use cmd_sage::config::Config;
//! use cmd_sage::suggester::Target;
//! use cmd_sage::suggestion_loop::{LoopConfig, SuggestionLoop};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let loop_config = LoopConfig::from_config(&config, Target::Git, None)?;
//!     let mut sage = SuggestionLoop::new(loop_config, /* collaborators */);
//!
//!     let interrupt = async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     };
//!     let report = sage.run("undo my last commit", interrupt).await?;
//!     println!("{:?}", report.outcome);
//!     Ok(())
//! }
//! ```

pub mod action;
pub mod clipboard;
pub mod config;
pub mod context;
pub mod credentials;
pub mod error;
pub mod executor;
pub mod highlight;
pub mod http_client;
pub mod prompt;
pub mod providers;
pub mod renderer;
pub mod sse;
pub mod stream;
pub mod suggester;
pub mod suggestion_loop;
pub mod terminal;
