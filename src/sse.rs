//! Decoding of provider server-sent event streams into text fragments.

use crate::http_client::ByteStream;
use crate::providers::Protocol;
use crate::stream::TextStream;
use anyhow::{anyhow, Result};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

/// Incremental SSE decoder.
///
/// Bytes are buffered until a blank line closes an event; each closed event's
/// `data:` payload is turned into at most one text delta.
pub struct SseParser {
    protocol: Protocol,
    /// Raw bytes of the event in progress. Kept undecoded so a multi-byte
    /// character split across chunks survives.
    buffer: Vec<u8>,
}

impl SseParser {
    pub fn new(protocol: Protocol) -> Self {
        Self {
            protocol,
            buffer: Vec::new(),
        }
    }

    /// Feeds a chunk and returns the text deltas of every event it completed.
    pub fn process(&mut self, chunk: &[u8]) -> Result<Vec<String>> {
        self.buffer.extend(chunk.iter().filter(|&&b| b != b'\r'));

        let mut deltas = Vec::new();
        while let Some(end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let event: Vec<u8> = self.buffer.drain(..end + 2).collect();
            if let Some(delta) = self.decode_event(&String::from_utf8_lossy(&event))? {
                deltas.push(delta);
            }
        }
        Ok(deltas)
    }

    /// Decodes whatever is left once the body ends without a trailing blank line.
    pub fn finish(&mut self) -> Result<Option<String>> {
        let rest = std::mem::take(&mut self.buffer);
        let rest = String::from_utf8_lossy(&rest);
        if rest.trim().is_empty() {
            return Ok(None);
        }
        self.decode_event(&rest)
    }

    fn decode_event(&self, event: &str) -> Result<Option<String>> {
        let data: Vec<&str> = event
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(str::trim)
            .collect();
        if data.is_empty() {
            return Ok(None);
        }
        let payload = data.join("\n");
        if payload == "[DONE]" {
            debug!("Received end-of-stream marker");
            return Ok(None);
        }

        let value: Value = match serde_json::from_str(&payload) {
            Ok(value) => value,
            Err(e) => {
                warn!("Skipping unparseable SSE payload ({}): {}", e, payload);
                return Ok(None);
            }
        };

        if let Some(message) = value.get("error").and_then(error_message) {
            return Err(anyhow!("provider error: {}", message));
        }

        let text = match self.protocol {
            Protocol::OpenAiChat => value
                .pointer("/choices/0/delta/content")
                .and_then(Value::as_str),
            Protocol::AnthropicMessages => {
                if value.get("type").and_then(Value::as_str) == Some("content_block_delta") {
                    value.pointer("/delta/text").and_then(Value::as_str)
                } else {
                    None
                }
            }
        };

        Ok(text.filter(|t| !t.is_empty()).map(str::to_string))
    }
}

fn error_message(error: &Value) -> Option<String> {
    error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| error.as_str().map(str::to_string))
}

/// Turns a raw SSE response body into a stream of text fragments.
pub fn text_stream(body: ByteStream, protocol: Protocol) -> TextStream {
    let state = (body, SseParser::new(protocol), false);
    let fragments = stream::unfold(state, |(mut body, mut parser, finished)| async move {
        if finished {
            return None;
        }
        match body.next().await {
            Some(Ok(chunk)) => {
                let item = parser.process(&chunk);
                Some((item, (body, parser, false)))
            }
            Some(Err(e)) => Some((Err(e), (body, parser, true))),
            None => {
                let item = parser.finish().map(|rest| rest.into_iter().collect());
                Some((item, (body, parser, true)))
            }
        }
    });

    fragments
        .flat_map(|batch: Result<Vec<String>>| match batch {
            Ok(deltas) => stream::iter(deltas.into_iter().map(Ok).collect::<Vec<_>>()),
            Err(e) => stream::iter(vec![Err(e)]),
        })
        .boxed()
}
