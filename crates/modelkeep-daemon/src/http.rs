//! HTTP backend abstraction for the daemon API.
//!
//! The trait allows injecting a fake backend in tests. The production
//! implementation uses reqwest and retries idempotent calls on transient
//! errors.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::DaemonClientConfig;
use crate::error::{HttpError, HttpResult};

// ============================================================================
// HTTP Backend Trait
// ============================================================================

/// Request methods the daemon API uses besides GET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Post,
    Delete,
}

/// Trait for HTTP backends talking JSON to the daemon.
///
/// This is an implementation detail - external code should use the core
/// ports.
#[async_trait]
pub trait HttpBackend: Send + Sync {
    /// GET a URL and deserialize the body. Retried on transient errors.
    async fn get_json<T: DeserializeOwned + Send>(&self, url: &Url) -> HttpResult<T>;

    /// POST a JSON body and deserialize the answer. Retried on transient
    /// errors, so only use for read-only calls.
    async fn query_json<T: DeserializeOwned + Send>(&self, url: &Url, body: &Value)
    -> HttpResult<T>;

    /// Send a request that changes daemon state; the body of the answer is
    /// discarded. Never retried.
    async fn execute(&self, verb: Verb, url: &Url, body: &Value, long: bool) -> HttpResult<()>;

    /// POST a request whose answer is a stream of JSON lines and read it to
    /// the end. Each line is passed to `on_line`; lines that are not JSON are
    /// skipped. No total timeout applies.
    async fn stream_json_lines(
        &self,
        url: &Url,
        body: &Value,
        on_line: &(dyn Fn(Value) + Send + Sync),
    ) -> HttpResult<()>;

    /// True if `url` answers with a success status.
    async fn ping(&self, url: &Url) -> bool;
}

// ============================================================================
// Reqwest Backend
// ============================================================================

/// Production HTTP backend using reqwest with retry logic.
#[derive(Clone)]
pub struct ReqwestBackend {
    client: reqwest::Client,
    long_client: reqwest::Client,
    stream_client: reqwest::Client,
    max_retries: u8,
    retry_base_delay: Duration,
}

impl ReqwestBackend {
    pub fn new(config: &DaemonClientConfig) -> HttpResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        let long_client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .timeout(config.build_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        let stream_client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            long_client,
            stream_client,
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay,
        })
    }

    /// Send with retry for transient errors (5xx and connection failures).
    async fn send_with_retry(
        &self,
        build: impl Fn() -> reqwest::RequestBuilder + Send + Sync,
        url: &Url,
    ) -> HttpResult<reqwest::Response> {
        let mut last_error: Option<HttpError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.retry_base_delay * 2u32.pow(u32::from(attempt) - 1);
                tokio::time::sleep(delay).await;
                debug!(url = %url, attempt, "Retrying daemon request");
            }

            match build().send().await {
                Ok(response) if response.status().is_server_error() && attempt < self.max_retries => {
                    last_error = Some(HttpError::Status {
                        status: response.status().as_u16(),
                        url: url.to_string(),
                        body: String::new(),
                    });
                }
                Ok(response) => return check_status(response, url).await,
                Err(e) => {
                    let err = HttpError::from_transport(e);
                    if attempt < self.max_retries && matches!(err, HttpError::Connect(_)) {
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| HttpError::Connect("no attempt was made".to_string())))
    }

    fn client_for(&self, long: bool) -> &reqwest::Client {
        if long { &self.long_client } else { &self.client }
    }
}

/// Turn a non-success status into `HttpError::Status`, keeping the body.
async fn check_status(response: reqwest::Response, url: &Url) -> HttpResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(HttpError::Status {
        status: status.as_u16(),
        url: url.to_string(),
        body,
    })
}

/// Splits a byte stream into newline-terminated lines.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Append `chunk` and return every line it completed.
    fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
            lines.push(self.pending.drain(..=end).collect());
        }
        lines
    }

    /// The unterminated tail, if any.
    fn finish(self) -> Option<Vec<u8>> {
        (!self.pending.is_empty()).then_some(self.pending)
    }
}

fn emit_json_line(line: &[u8], on_line: &(dyn Fn(Value) + Send + Sync)) {
    let line = line.trim_ascii();
    if line.is_empty() {
        return;
    }
    match serde_json::from_slice(line) {
        Ok(value) => on_line(value),
        Err(e) => debug!(error = %e, "Skipping stream line that is not JSON"),
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn get_json<T: DeserializeOwned + Send>(&self, url: &Url) -> HttpResult<T> {
        let response = self
            .send_with_retry(|| self.client.get(url.as_str()), url)
            .await?;
        Ok(response.json().await?)
    }

    async fn query_json<T: DeserializeOwned + Send>(
        &self,
        url: &Url,
        body: &Value,
    ) -> HttpResult<T> {
        let response = self
            .send_with_retry(|| self.client.post(url.as_str()).json(body), url)
            .await?;
        Ok(response.json().await?)
    }

    async fn execute(&self, verb: Verb, url: &Url, body: &Value, long: bool) -> HttpResult<()> {
        let client = self.client_for(long);
        let request = match verb {
            Verb::Post => client.post(url.as_str()),
            Verb::Delete => client.delete(url.as_str()),
        };
        let response = request
            .json(body)
            .send()
            .await
            .map_err(HttpError::from_transport)?;
        check_status(response, url).await?;
        Ok(())
    }

    async fn stream_json_lines(
        &self,
        url: &Url,
        body: &Value,
        on_line: &(dyn Fn(Value) + Send + Sync),
    ) -> HttpResult<()> {
        let response = self
            .stream_client
            .post(url.as_str())
            .json(body)
            .send()
            .await
            .map_err(HttpError::from_transport)?;
        let mut response = check_status(response, url).await?;

        let mut lines = LineBuffer::default();
        while let Some(chunk) = response.chunk().await.map_err(HttpError::from_transport)? {
            for line in lines.push(&chunk) {
                emit_json_line(&line, on_line);
            }
        }
        if let Some(rest) = lines.finish() {
            emit_json_line(&rest, on_line);
        }
        debug!(url = %url, "Streaming request finished");
        Ok(())
    }

    async fn ping(&self, url: &Url) -> bool {
        match self.client.get(url.as_str()).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(url = %url, error = %e, "Daemon ping failed");
                false
            }
        }
    }
}

// ============================================================================
// Fake Backend for Testing
// ============================================================================
