//! Catalog client implementing `DaemonClientPort`.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use modelkeep_core::{DaemonClientPort, DaemonError, ModelInfo, ModelSummary};
use serde_json::{Value, json};
use tracing::{debug, info};
use url::Url;

use crate::config::DaemonClientConfig;
use crate::error::{HttpError, HttpResult};
use crate::http::{HttpBackend, ReqwestBackend, Verb};
use crate::models::{ModelRequest, PullRequest, PullStatus, ShowResponse, TagsResponse};
use crate::url::{self as endpoints, endpoint, parse_base_url};

/// Default daemon client using the reqwest HTTP backend.
pub type DefaultDaemonClient = DaemonClient<ReqwestBackend>;

/// Client for the daemon's catalog API.
///
/// Generic over the HTTP backend so tests can inject a fake. Use
/// `DefaultDaemonClient` in production code.
pub struct DaemonClient<B: HttpBackend> {
    backend: B,
    base_url: Url,
}

impl DefaultDaemonClient {
    pub fn new(config: &DaemonClientConfig) -> HttpResult<Self> {
        Ok(Self {
            backend: ReqwestBackend::new(config)?,
            base_url: parse_base_url(&config.base_url)?,
        })
    }
}

impl<B: HttpBackend> DaemonClient<B> {
    /// Create a client over a custom backend.
    pub fn with_backend(base_url: &str, backend: B) -> HttpResult<Self> {
        Ok(Self {
            backend,
            base_url: parse_base_url(base_url)?,
        })
    }

    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, DaemonError> {
        endpoint(&self.base_url, path).map_err(|e| HttpError::from(e).into_daemon_error(None))
    }
}

#[async_trait]
impl<B: HttpBackend> DaemonClientPort for DaemonClient<B> {
    async fn check_connection(&self) -> bool {
        match self.url(endpoints::TAGS) {
            Ok(url) => self.backend.ping(&url).await,
            Err(_) => false,
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelSummary>, DaemonError> {
        let url = self.url(endpoints::TAGS)?;
        let tags: TagsResponse = self
            .backend
            .get_json(&url)
            .await
            .map_err(|e| e.into_daemon_error(None))?;
        debug!(count = tags.models.len(), "Listed models");
        Ok(tags.models.into_iter().map(ModelSummary::from).collect())
    }

    async fn show_model(&self, name: &str) -> Result<Option<ModelInfo>, DaemonError> {
        let url = self.url(endpoints::SHOW)?;
        let body = json!(ModelRequest::new(name));
        match self.backend.query_json::<ShowResponse>(&url, &body).await {
            Ok(show) => Ok(Some(show.into_info(name))),
            Err(HttpError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e.into_daemon_error(Some(name))),
        }
    }

    async fn delete_model(&self, name: &str) -> Result<(), DaemonError> {
        let url = self.url(endpoints::DELETE)?;
        self.backend
            .execute(Verb::Delete, &url, &json!(ModelRequest::new(name)), false)
            .await
            .map_err(|e| e.into_daemon_error(Some(name)))?;
        info!(model = %name, "Daemon deleted model");
        Ok(())
    }

    async fn pull_model(
        &self,
        name: &str,
        progress: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> Result<(), DaemonError> {
        let url = self.url(endpoints::PULL)?;
        let body = json!(PullRequest {
            model: name,
            name,
            stream: true,
        });

        let failure: Mutex<Option<String>> = Mutex::new(None);
        let last: Mutex<String> = Mutex::new(String::new());
        let on_line = |line: Value| {
            let status: PullStatus = match serde_json::from_value(line) {
                Ok(status) => status,
                Err(e) => {
                    debug!(error = %e, "Ignoring unexpected pull status");
                    return;
                }
            };
            if let Some(error) = &status.error {
                *lock(&failure) = Some(error.clone());
                return;
            }
            if let Some(message) = status.message() {
                let mut last = lock(&last);
                if *last != message {
                    progress(&message);
                    *last = message;
                }
            }
        };

        self.backend
            .stream_json_lines(&url, &body, &on_line)
            .await
            .map_err(|e| e.into_daemon_error(Some(name)))?;

        if let Some(message) = failure.into_inner().unwrap_or_else(PoisonError::into_inner) {
            return Err(DaemonError::Rejected(message));
        }
        info!(model = %name, "Daemon finished pull");
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
