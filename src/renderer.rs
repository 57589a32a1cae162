//! Real-time display of streamed text with in-place highlighting.
//!
//! Fragments are written the moment they arrive. Once the stream is exhausted
//! the raw text is swapped for its highlighted rendering by moving the cursor
//! back to where the text started. That only works while the text is still
//! inside the viewport, so the swap is attempted only on an interactive
//! terminal at least [`MIN_REPLACE_COLUMNS`] wide; everywhere else the
//! highlighted text is appended after a line break.

use crate::error::SageError;
use crate::highlight::Highlighter;
use crate::stream::TextStream;
use crate::terminal::{Terminal, TerminalState};
use futures::StreamExt;
use tracing::{debug, warn};
use unicode_width::UnicodeWidthStr;

/// Narrowest terminal on which in-place replacement is attempted.
pub const MIN_REPLACE_COLUMNS: u16 = 80;

pub struct StreamRenderer<T: Terminal> {
    terminal: T,
}

impl<T: Terminal> StreamRenderer<T> {
    pub fn new(terminal: T) -> Self {
        Self { terminal }
    }

    /// Streams `source` to the terminal, then upgrades it to the highlighted
    /// version. Returns the accumulated plain text.
    ///
    /// # Errors
    ///
    /// [`SageError::StreamConsumption`] if a fragment fails; whatever was
    /// already written stays on screen and nothing highlighted follows it.
    /// [`SageError::Terminal`] if writing to the terminal fails.
    pub async fn render(
        &mut self,
        mut source: TextStream,
        highlighter: &dyn Highlighter,
    ) -> Result<String, SageError> {
        let mut accumulated = String::new();
        while let Some(fragment) = source.next().await {
            let fragment = fragment.map_err(SageError::stream)?;
            self.terminal.write_str(&fragment)?;
            accumulated.push_str(&fragment);
        }

        let styled = match highlighter.highlight(&accumulated) {
            Ok(styled) => styled,
            Err(e) => {
                warn!("Highlighting failed, keeping raw output: {}", e);
                return Ok(accumulated);
            }
        };

        let state = self.terminal.state();
        if is_safe_to_replace(state) {
            let rows = rendered_line_count(&accumulated, state.columns);
            debug!("Replacing {} rendered row(s) in place", rows);
            if rows > 1 {
                let up = u16::try_from(rows - 1).unwrap_or(u16::MAX);
                self.terminal.move_up(up)?;
            }
            self.terminal.move_to_column_zero()?;
            self.terminal.clear_to_end()?;
            self.terminal.write_str(&styled)?;
        } else {
            debug!(
                "Appending highlighted output (interactive: {}, columns: {})",
                state.is_interactive, state.columns
            );
            self.terminal.write_str("\n")?;
            self.terminal.write_str(&styled)?;
        }

        Ok(accumulated)
    }

    /// Writes a status line between renders.
    pub fn notice(&mut self, message: &str) -> Result<(), SageError> {
        self.terminal.write_str(&format!("{}\n", message))?;
        Ok(())
    }
}

/// In-place replacement needs an interactive terminal wide enough for the
/// cursor arithmetic to stay inside the viewport.
pub fn is_safe_to_replace(state: TerminalState) -> bool {
    state.is_interactive && state.columns >= MIN_REPLACE_COLUMNS
}

/// Terminal tab stops are every eight columns.
const TAB_WIDTH: usize = 8;

/// Number of terminal rows `text` occupies when every logical line soft-wraps
/// at `columns`. Escape sequences take no room, tabs advance to the next tab
/// stop, and an empty line still takes one row. A width of zero means no
/// wrapping.
pub fn rendered_line_count(text: &str, columns: u16) -> usize {
    let columns = usize::from(columns);
    text.split('\n')
        .map(|line| {
            let width = display_width(&strip_ansi(line));
            if width == 0 || columns == 0 {
                1
            } else {
                width.div_ceil(columns)
            }
        })
        .sum()
}

/// Display width of a single logical line with tabs expanded.
fn display_width(line: &str) -> usize {
    let mut segments = line.split('\t');
    let mut width = segments.next().map(UnicodeWidthStr::width).unwrap_or(0);
    for segment in segments {
        width = (width / TAB_WIDTH + 1) * TAB_WIDTH + UnicodeWidthStr::width(segment);
    }
    width
}

/// Removes ANSI escape sequences (CSI, OSC and two-byte escapes).
pub fn strip_ansi(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\x1b' {
            result.push(ch);
            continue;
        }
        match chars.peek() {
            Some('[') => {
                chars.next();
                // Parameters and intermediates, then one final byte in '@'..='~'.
                for c in chars.by_ref() {
                    if ('@'..='~').contains(&c) {
                        break;
                    }
                }
            }
            Some(']') => {
                chars.next();
                // OSC runs until BEL or ESC '\'.
                while let Some(c) = chars.next() {
                    if c == '\x07' {
                        break;
                    }
                    if c == '\x1b' && chars.peek() == Some(&'\\') {
                        chars.next();
                        break;
                    }
                }
            }
            Some(_) => {
                chars.next();
            }
            None => {}
        }
    }
    result
}
