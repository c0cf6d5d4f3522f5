//! Model builder over the daemon's HTTP create and copy endpoints.

use async_trait::async_trait;
use modelkeep_core::{BuildError, ModelBuilderPort, ModelDefinition};
use serde_json::json;
use tracing::info;
use url::Url;

use crate::config::DaemonClientConfig;
use crate::error::{HttpError, HttpResult};
use crate::http::{HttpBackend, ReqwestBackend, Verb};
use crate::models::{CopyRequest, CreateRequest};
use crate::url::{self as endpoints, endpoint, parse_base_url};

/// HTTP model builder using the reqwest backend.
pub type DefaultHttpModelBuilder = HttpModelBuilder<ReqwestBackend>;

/// Builds and copies models through the daemon's HTTP API.
pub struct HttpModelBuilder<B: HttpBackend> {
    backend: B,
    base_url: Url,
}

impl DefaultHttpModelBuilder {
    pub fn new(config: &DaemonClientConfig) -> HttpResult<Self> {
        Ok(Self {
            backend: ReqwestBackend::new(config)?,
            base_url: parse_base_url(&config.base_url)?,
        })
    }
}

impl<B: HttpBackend> HttpModelBuilder<B> {
    pub fn with_backend(base_url: &str, backend: B) -> HttpResult<Self> {
        Ok(Self {
            backend,
            base_url: parse_base_url(base_url)?,
        })
    }

    fn url(&self, path: &str, name: &str) -> Result<Url, BuildError> {
        endpoint(&self.base_url, path).map_err(|e| HttpError::from(e).into_build_error(name))
    }
}

#[async_trait]
impl<B: HttpBackend> ModelBuilderPort for HttpModelBuilder<B> {
    async fn build(&self, name: &str, definition: &str) -> Result<(), BuildError> {
        let url = self.url(endpoints::CREATE, name)?;
        let body = json!(CreateRequest {
            model: name,
            name,
            modelfile: ModelDefinition::new(definition).to_daemon_text(),
            stream: false,
        });
        self.backend
            .execute(Verb::Post, &url, &body, true)
            .await
            .map_err(|e| e.into_build_error(name))?;
        info!(model = %name, "Daemon built model");
        Ok(())
    }

    async fn copy(&self, source: &str, destination: &str) -> Result<(), BuildError> {
        let url = self.url(endpoints::COPY, destination)?;
        let body = json!(CopyRequest {
            source,
            destination,
        });
        self.backend
            .execute(Verb::Post, &url, &body, true)
            .await
            .map_err(|e| e.into_build_error(destination))?;
        info!(source = %source, destination = %destination, "Daemon copied model");
        Ok(())
    }
}
