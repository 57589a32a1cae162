//! Incremental text sources.

use anyhow::Result;
use futures::stream::{self, BoxStream, StreamExt};

/// A single-pass, finite sequence of text fragments.
///
/// The accumulated text is whatever the consumer concatenates; the
/// [`crate::renderer::StreamRenderer`] does exactly that while displaying it.
pub type TextStream = BoxStream<'static, Result<String>>;

/// Wraps already-known fragments as a [`TextStream`].
pub fn from_fragments<I, S>(fragments: I) -> TextStream
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let items: Vec<Result<String>> = fragments.into_iter().map(|f| Ok(f.into())).collect();
    stream::iter(items).boxed()
}

/// Splits `text` into word-sized fragments, keeping the whitespace attached.
pub fn chunk_words(text: &str) -> TextStream {
    let mut fragments = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if ch.is_whitespace() {
            fragments.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        fragments.push(current);
    }
    from_fragments(fragments)
}
