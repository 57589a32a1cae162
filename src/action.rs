//! The closed set of actions a user can take on a suggested command.

use crate::error::SageError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Run,
    Revise,
    Explain,
    Copy,
    Cancel,
}

impl ActionKind {
    /// All actions in the order they are offered to the user.
    pub const ALL: [ActionKind; 5] = [
        ActionKind::Run,
        ActionKind::Revise,
        ActionKind::Explain,
        ActionKind::Copy,
        ActionKind::Cancel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Run => "run",
            ActionKind::Revise => "revise",
            ActionKind::Explain => "explain",
            ActionKind::Copy => "copy",
            ActionKind::Cancel => "cancel",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ActionKind::Run => "Run",
            ActionKind::Revise => "Revise",
            ActionKind::Explain => "Explain",
            ActionKind::Copy => "Copy",
            ActionKind::Cancel => "Cancel",
        }
    }

    /// Terminal actions end the loop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionKind::Run | ActionKind::Cancel)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = SageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        ActionKind::ALL
            .into_iter()
            .find(|action| action.as_str() == normalized)
            .ok_or_else(|| {
                SageError::Configuration(format!(
                    "unknown action '{}' (expected one of: run, revise, explain, copy, cancel)",
                    s
                ))
            })
    }
}
