//! Narrow, write-only access to the terminal.
//!
//! Cursor position and screen contents live in the terminal emulator, not in
//! this process, so nothing here tracks them. Callers only get to write text,
//! move the cursor up, return to column 0 and clear to the end of the screen.

use crossterm::{cursor, queue, terminal};
use std::io::{self, IsTerminal, Stdout, Write};

/// Snapshot of the terminal, taken fresh for every render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalState {
    pub is_interactive: bool,
    pub columns: u16,
}

pub trait Terminal: Send {
    fn state(&self) -> TerminalState;

    /// Writes text and flushes it so it shows up immediately.
    fn write_str(&mut self, text: &str) -> io::Result<()>;

    fn move_up(&mut self, rows: u16) -> io::Result<()>;

    fn move_to_column_zero(&mut self) -> io::Result<()>;

    /// Clears from the cursor to the end of the screen.
    fn clear_to_end(&mut self) -> io::Result<()>;
}

/// The process's standard output, driven through crossterm.
pub struct CrosstermTerminal {
    out: Stdout,
}

impl CrosstermTerminal {
    pub fn new() -> Self {
        Self { out: io::stdout() }
    }
}

impl Default for CrosstermTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal for CrosstermTerminal {
    fn state(&self) -> TerminalState {
        let is_interactive = self.out.is_terminal();
        let columns = if is_interactive {
            terminal::size().map(|(cols, _)| cols).unwrap_or(0)
        } else {
            0
        };
        TerminalState {
            is_interactive,
            columns,
        }
    }

    fn write_str(&mut self, text: &str) -> io::Result<()> {
        let mut out = self.out.lock();
        out.write_all(text.as_bytes())?;
        out.flush()
    }

    fn move_up(&mut self, rows: u16) -> io::Result<()> {
        if rows == 0 {
            return Ok(());
        }
        let mut out = self.out.lock();
        queue!(out, cursor::MoveUp(rows))?;
        out.flush()
    }

    fn move_to_column_zero(&mut self) -> io::Result<()> {
        let mut out = self.out.lock();
        queue!(out, cursor::MoveToColumn(0))?;
        out.flush()
    }

    fn clear_to_end(&mut self) -> io::Result<()> {
        let mut out = self.out.lock();
        queue!(out, terminal::Clear(terminal::ClearType::FromCursorDown))?;
        out.flush()
    }
}
