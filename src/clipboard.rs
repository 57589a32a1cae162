//! System clipboard access for the Copy action.

use anyhow::{anyhow, Result};
use tracing::debug;

pub trait Clipboard {
    fn set_text(&mut self, text: &str) -> Result<()>;
}

/// Clipboard backed by `arboard`.
///
/// The handle is opened lazily so that a machine without a clipboard (a bare
/// SSH session, CI) only fails when Copy is actually chosen.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        if self.inner.is_none() {
            let clipboard =
                arboard::Clipboard::new().map_err(|e| anyhow!("clipboard unavailable: {}", e))?;
            self.inner = Some(clipboard);
        }
        if let Some(clipboard) = self.inner.as_mut() {
            clipboard
                .set_text(text.to_string())
                .map_err(|e| anyhow!("could not write to clipboard: {}", e))?;
            debug!("Copied {} bytes to clipboard", text.len());
        }
        Ok(())
    }
}
