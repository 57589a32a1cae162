//! HTTP client abstraction for the model providers.
//!
//! Suggestions arrive as server-sent events, so the client hands back the raw
//! response body as a byte stream and leaves decoding to [`crate::sse`].

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::Client;

/// Raw response body, chunked as it comes off the wire.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Trait for HTTP communication with external APIs.
///
/// This abstraction allows injecting mock HTTP clients for testing without
/// making real network requests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends a POST request with a JSON body and streams the response body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent or the server answers
    /// with a non-success status. Failures while reading the body surface as
    /// `Err` items of the returned stream.
    async fn post_json_stream(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: &serde_json::Value,
    ) -> Result<ByteStream>;
}

/// HTTP client implementation using reqwest.
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn post_json_stream(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: &serde_json::Value,
    ) -> Result<ByteStream> {
        let mut request = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .header("accept", "text/event-stream");

        for (key, value) in headers {
            request = request.header(*key, value);
        }

        let response = request
            .json(body)
            .send()
            .await
            .map_err(|e| anyhow!("request to '{}' failed: {}", url, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "API endpoint '{}' returned HTTP {}: {}",
                url,
                status,
                error_body.trim()
            ));
        }

        let stream = response
            .bytes_stream()
            .map(|item| item.map_err(|e| anyhow!("error reading response stream: {}", e)));
        Ok(stream.boxed())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use futures::stream;
    use std::sync::Mutex;

    /// Mock HTTP client that replays canned SSE bodies and records requests.
    pub struct MockHttpClient {
        chunks: Vec<String>,
        pub requests: Mutex<Vec<(String, serde_json::Value)>>,
    }

    impl MockHttpClient {
        pub fn new(chunks: &[&str]) -> Self {
            Self {
                chunks: chunks.iter().map(|c| c.to_string()).collect(),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn post_json_stream(
            &self,
            url: &str,
            _headers: &[(&str, String)],
            body: &serde_json::Value,
        ) -> Result<ByteStream> {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_string(), body.clone()));
            let items: Vec<Result<Bytes>> = self
                .chunks
                .iter()
                .map(|c| Ok(Bytes::from(c.clone())))
                .collect();
            Ok(stream::iter(items).boxed())
        }
    }

    #[tokio::test]
    async fn test_mock_http_client_replays_chunks() {
        let client = MockHttpClient::new(&["data: a\n\n", "data: b\n\n"]);
        let body = serde_json::json!({"k": "v"});

        let stream = client.post_json_stream("http://x", &[], &body).await.unwrap();
        let chunks: Vec<Bytes> = stream.map(|c| c.unwrap()).collect().await;

        assert_eq!(chunks.len(), 2);
        assert_eq!(client.requests.lock().unwrap()[0].1, body);
    }
}
