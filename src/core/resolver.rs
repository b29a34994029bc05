//! Access to the remote directory-listing and file-read service.
//!
//! [`RemoteService`] is the seam between the engine and the network so tests
//! can script responses. [`HttpService`] talks to the real service with
//! `reqwest`; [`ContentResolver`] is the leaf-content entry point used by both
//! preview and aggregation.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::error::{FetchError, LoadError};
use super::tree::{Tree, WireNode};

/// The request/response collaborator that owns the real file system.
#[async_trait]
pub trait RemoteService: Send + Sync + 'static {
    /// Fetches the full snapshot rooted at `root`.
    async fn fetch_tree(&self, root: &str) -> Result<Tree, LoadError>;

    /// Fetches the raw text body of the file at `path`.
    async fn fetch_file(&self, path: &str) -> Result<String, FetchError>;
}

/// `reqwest` implementation of [`RemoteService`].
///
/// Endpoints are resolved against `base_url`: `{base}/tree?root=..` and
/// `{base}/file?path=..`.
#[derive(Debug, Clone)]
pub struct HttpService {
    base_url: String,
    client: reqwest::Client,
}

impl HttpService {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                reqwest::Client::new()
            });
        Self::with_client(base_url, client)
    }

    /// Uses a preconfigured client, e.g. one with custom proxy settings.
    pub fn with_client(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }
}

#[async_trait]
impl RemoteService for HttpService {
    async fn fetch_tree(&self, root: &str) -> Result<Tree, LoadError> {
        let transport = |source| LoadError::Transport {
            root: root.to_string(),
            source,
        };
        let response = self
            .client
            .get(self.endpoint("tree"))
            .query(&[("root", root)])
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                root: root.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(transport)?;
        let wire = WireNode::from_slice(&body).map_err(|source| LoadError::Decode {
            root: root.to_string(),
            source,
        })?;
        Tree::try_from(wire).map_err(|source| LoadError::Invalid {
            root: root.to_string(),
            source,
        })
    }

    async fn fetch_file(&self, path: &str) -> Result<String, FetchError> {
        let transport = |source| FetchError::Transport {
            path: path.to_string(),
            source,
        };
        let response = self
            .client
            .get(self.endpoint("file"))
            .query(&[("path", path)])
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(transport)
    }
}

/// Resolves leaf content. No caching: every call is a fresh request.
#[derive(Clone)]
pub struct ContentResolver {
    service: Arc<dyn RemoteService>,
}

impl ContentResolver {
    pub fn new(service: Arc<dyn RemoteService>) -> Self {
        Self { service }
    }

    pub async fn resolve(&self, path: &str) -> Result<String, FetchError> {
        tracing::debug!("Resolving content of {}", path);
        self.service.fetch_file(path).await
    }
}
