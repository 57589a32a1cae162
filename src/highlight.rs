//! Plain text to ANSI-styled text.

use anyhow::{anyhow, Result};
use std::sync::OnceLock;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};

/// A pure transform from plain text to a styled rendering of it.
pub trait Highlighter: Send + Sync {
    fn highlight(&self, text: &str) -> Result<String>;
}

/// Leaves text untouched; used when highlighting is switched off.
pub struct PlainHighlighter;

impl Highlighter for PlainHighlighter {
    fn highlight(&self, text: &str) -> Result<String> {
        Ok(text.to_string())
    }
}

/// Language a [`SyntectHighlighter`] highlights as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Shell,
    Markdown,
}

impl Language {
    fn token(&self) -> &'static str {
        match self {
            Language::Shell => "sh",
            Language::Markdown => "md",
        }
    }
}

struct SyntectAssets {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
}

/// Syntax definitions and themes, loaded once per process.
fn syntect_assets() -> &'static SyntectAssets {
    static ASSETS: OnceLock<SyntectAssets> = OnceLock::new();
    ASSETS.get_or_init(|| SyntectAssets {
        syntax_set: SyntaxSet::load_defaults_newlines(),
        theme_set: ThemeSet::load_defaults(),
    })
}

pub struct SyntectHighlighter {
    language: Language,
    theme: Theme,
}

impl SyntectHighlighter {
    /// Creates a highlighter for `language` using the named syntect theme.
    ///
    /// # Errors
    ///
    /// Returns an error if no bundled theme has that name.
    pub fn new(language: Language, theme_name: &str) -> Result<Self> {
        let assets = syntect_assets();
        let theme = assets.theme_set.themes.get(theme_name).cloned().ok_or_else(|| {
            let mut known: Vec<&str> = assets.theme_set.themes.keys().map(String::as_str).collect();
            known.sort_unstable();
            anyhow!(
                "unknown highlight theme '{}' (available: {})",
                theme_name,
                known.join(", ")
            )
        })?;
        Ok(Self { language, theme })
    }
}

impl Highlighter for SyntectHighlighter {
    fn highlight(&self, text: &str) -> Result<String> {
        let assets = syntect_assets();
        let syntax = assets
            .syntax_set
            .find_syntax_by_token(self.language.token())
            .unwrap_or_else(|| assets.syntax_set.find_syntax_plain_text());

        let mut highlighter = HighlightLines::new(syntax, &self.theme);
        let mut styled = String::with_capacity(text.len() * 2);
        for line in LinesWithEndings::from(text) {
            let ranges = highlighter.highlight_line(line, &assets.syntax_set)?;
            styled.push_str(&as_24_bit_terminal_escaped(&ranges, false));
        }
        styled.push_str("\x1b[0m");
        Ok(styled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::strip_ansi;

    #[test]
    fn test_plain_highlighter_is_identity() {
        assert_eq!(PlainHighlighter.highlight("ls -la").unwrap(), "ls -la");
    }

    #[test]
    fn test_unknown_theme_is_rejected() {
        let err = SyntectHighlighter::new(Language::Shell, "no-such-theme")
            .err()
            .unwrap();
        assert!(err.to_string().contains("no-such-theme"));
    }

    #[test]
    fn test_shell_highlighting_keeps_visible_text() {
        let highlighter = SyntectHighlighter::new(Language::Shell, "base16-ocean.dark").unwrap();
        let command = "grep -rn \"TODO\" src | wc -l";

        let styled = highlighter.highlight(command).unwrap();

        assert!(styled.contains('\x1b'));
        assert_eq!(strip_ansi(&styled), command);
    }

    #[test]
    fn test_highlighting_is_deterministic() {
        let highlighter = SyntectHighlighter::new(Language::Markdown, "base16-ocean.dark").unwrap();
        let text = "# Explanation\n\n`ls` lists files.\n";
        assert_eq!(highlighter.highlight(text).unwrap(), highlighter.highlight(text).unwrap());
    }
}
