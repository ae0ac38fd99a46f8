//! Manifest sources.
//!
//! A source only produces manifest text; parsing and checks happen in the
//! registry so every source fails the same way on a bad document.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ManifestConfig;
use crate::manifest::error::ManifestError;

/// Anything that can produce the text of a manifest document.
#[async_trait]
pub trait ManifestSource: Send + Sync + fmt::Debug {
    /// Fetch the raw document. A source that does not exist reports
    /// [`ManifestError::NotFound`].
    async fn fetch(&self) -> Result<String, ManifestError>;

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

/// Reads the manifest from a local file.
#[derive(Debug, Clone)]
pub struct FileManifestSource {
    path: PathBuf,
}

impl FileManifestSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ManifestSource for FileManifestSource {
    async fn fetch(&self) -> Result<String, ManifestError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ManifestError::NotFound(self.describe()),
                _ => ManifestError::Io {
                    path: self.describe(),
                    source: e,
                },
            })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Fetches the manifest over HTTP (e.g., another service's
/// `/.well-known/ai-actions.json`).
#[derive(Debug, Clone)]
pub struct HttpManifestSource {
    url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpManifestSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl ManifestSource for HttpManifestSource {
    async fn fetch(&self) -> Result<String, ManifestError> {
        let fetch_error = |reason: String| ManifestError::Fetch {
            url: self.url.clone(),
            reason,
        };

        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ManifestError::NotFound(self.url.clone()));
        }
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {}", status)));
        }

        response.text().await.map_err(|e| fetch_error(e.to_string()))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Serves manifest text held in memory.
#[derive(Debug, Clone)]
pub struct InlineManifestSource {
    text: String,
}

impl InlineManifestSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl ManifestSource for InlineManifestSource {
    async fn fetch(&self) -> Result<String, ManifestError> {
        Ok(self.text.clone())
    }

    fn describe(&self) -> String {
        "<inline>".to_string()
    }
}

/// Build the configured source. A URL takes precedence over a path.
pub fn source_from_config(config: &ManifestConfig) -> Arc<dyn ManifestSource> {
    match &config.url {
        Some(url) => Arc::new(HttpManifestSource::new(
            url.clone(),
            Duration::from_secs(config.fetch_timeout_secs),
        )),
        None => Arc::new(FileManifestSource::new(&config.path)),
    }
}
