//! Remote provider.
//!
//! Reads a `kex.json` index published next to a set of guideline files
//! (the layout produced by the static exporter) and fetches bodies over
//! HTTP on demand. When a token is configured, every request carries
//! `Authorization: Bearer <token>`.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use tracing::debug;

use crate::models::IndexSchema;
use crate::parser::strip_frontmatter;
use crate::provider::{is_remote, LoadOutcome, Provider};

const INDEX_FILE: &str = "kex.json";

/// Provider backed by an HTTP-served `kex.json` bundle.
#[derive(Debug, Clone)]
pub struct HttpProvider {
    base: Url,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpProvider {
    /// Create a provider rooted at `root_url`. A trailing `/` is added when
    /// missing so relative paths resolve inside the root.
    pub fn new(root_url: &str, token: Option<String>) -> Result<Self> {
        let normalized = if root_url.ends_with('/') {
            root_url.to_string()
        } else {
            format!("{root_url}/")
        };
        let base = Url::parse(&normalized)
            .with_context(|| format!("invalid remote source URL: {root_url}"))?;
        Ok(Self {
            base,
            token: token.filter(|t| !t.is_empty()),
            client: reqwest::Client::new(),
        })
    }

    /// URL of the `kex.json` index.
    pub fn index_url(&self) -> Result<Url> {
        self.base
            .join(INDEX_FILE)
            .with_context(|| format!("failed to build index URL from {}", self.base))
    }

    /// Resolve a document path against the root, passing absolute URLs
    /// through unchanged.
    pub fn resolve(&self, path: &str) -> Result<Url> {
        if is_remote(path) {
            return Url::parse(path).with_context(|| format!("invalid document URL: {path}"));
        }
        self.base
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("failed to resolve {path} against {}", self.base))
    }

    async fn get(&self, url: Url) -> Result<String> {
        let mut request = self.client.get(url.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = response.status();
        if status != StatusCode::OK {
            bail!("unexpected status {} fetching {}", status, url);
        }

        response
            .text()
            .await
            .with_context(|| format!("failed to read response body from {url}"))
    }
}

#[async_trait]
impl Provider for HttpProvider {
    fn name(&self) -> String {
        format!("http:{}", self.base)
    }

    async fn load(&self) -> Result<LoadOutcome> {
        let url = self.index_url()?;
        let body = self.get(url.clone()).await?;
        let schema: IndexSchema = serde_json::from_str(&body)
            .with_context(|| format!("failed to parse index from {url}"))?;

        debug!(
            provider = %self.name(),
            documents = schema.documents.len(),
            "remote index loaded"
        );
        Ok(LoadOutcome::new(schema))
    }

    async fn fetch_content(&self, path: &str) -> Result<String> {
        let url = self.resolve(path)?;
        let content = self.get(url).await?;
        Ok(strip_frontmatter(&content))
    }
}
