//! Document providers.
//!
//! A [`Provider`] yields an [`IndexSchema`] describing a set of documents
//! and fetches individual bodies on demand. Three implementations exist:
//!
//! | Provider | Module | Source |
//! |----------|--------|--------|
//! | [`FilesystemProvider`](crate::provider_fs::FilesystemProvider) | [`provider_fs`](crate::provider_fs) | Local directory tree of `.md` files |
//! | [`HttpProvider`](crate::provider_http::HttpProvider) | [`provider_http`](crate::provider_http) | Remote `kex.json` bundle |
//! | [`CompositeProvider`](crate::provider_composite::CompositeProvider) | [`provider_composite`](crate::provider_composite) | Ordered list of providers |
//!
//! [`build_provider`] assembles the composite from a resolved [`Config`].

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

use crate::config::Config;
use crate::models::IndexSchema;
use crate::provider_composite::CompositeProvider;
use crate::provider_fs::FilesystemProvider;
use crate::provider_http::HttpProvider;

/// Result of a successful [`Provider::load`].
///
/// `errors` holds non-fatal problems (a malformed file, a duplicate ID);
/// the schema contains every document that loaded cleanly.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub schema: IndexSchema,
    pub errors: Vec<anyhow::Error>,
}

impl LoadOutcome {
    pub fn new(schema: IndexSchema) -> Self {
        Self {
            schema,
            errors: Vec::new(),
        }
    }
}

/// A source of guideline documents.
///
/// # Lifecycle
///
/// 1. [`load`](Provider::load) is called once at startup. An `Err` is a
///    fatal failure: no schema could be produced at all.
/// 2. [`fetch_document`](Provider::fetch_document) is called lazily, the
///    first time an agent reads a document, with the `id` and `path` taken
///    from the loaded schema.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short label used in logs (e.g. `"filesystem:contents"`).
    fn name(&self) -> String;

    /// Load the document index.
    async fn load(&self) -> Result<LoadOutcome>;

    /// Fetch the body (front-matter stripped) of the document at `path`.
    async fn fetch_content(&self, path: &str) -> Result<String>;

    /// Fetch the body of the loaded document `id`, stored at `path`.
    ///
    /// Paths are only unique within one provider; providers that merge
    /// several sources override this to route by `id`.
    async fn fetch_document(&self, _id: &str, path: &str) -> Result<String> {
        self.fetch_content(path).await
    }
}

/// Whether a configured root refers to a remote index.
pub fn is_remote(root: &str) -> bool {
    root.starts_with("http://") || root.starts_with("https://")
}

/// Build the provider stack for a configuration.
///
/// Every `source` root becomes a local provider; each `references` entry
/// becomes a remote provider for `http(s)` URLs and a local one otherwise.
/// Relative local roots resolve against `project_root`. Order is preserved
/// so earlier sources win ID collisions.
pub fn build_provider(config: &Config, project_root: &Path) -> Result<CompositeProvider> {
    let token = config.effective_remote_token();
    let mut providers: Vec<Box<dyn Provider>> = Vec::new();

    for root in config.sources.iter().chain(config.references.iter()) {
        if is_remote(root) {
            providers.push(Box::new(HttpProvider::new(root, token.clone())?));
        } else {
            let path = Path::new(root);
            let resolved = if path.is_absolute() {
                path.to_path_buf()
            } else {
                project_root.join(path)
            };
            providers.push(Box::new(FilesystemProvider::new(resolved)));
        }
    }

    Ok(CompositeProvider::new(providers))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://example.com/guidelines/"));
        assert!(is_remote("http://localhost:8080"));
        assert!(!is_remote("contents"));
        assert!(!is_remote("/abs/path"));
    }

    #[test]
    fn test_build_provider_keeps_order() {
        let config = Config {
            sources: vec!["contents".to_string()],
            references: vec![
                "https://example.com/kex/".to_string(),
                "../shared".to_string(),
            ],
            ..Default::default()
        };
        let composite = build_provider(&config, Path::new("/project")).unwrap();
        let names = composite.provider_names();
        assert_eq!(names.len(), 3);
        assert!(names[0].starts_with("filesystem:"));
        assert!(names[0].contains("contents"));
        assert!(names[1].starts_with("http:"));
        assert!(names[2].contains("shared"));
    }
}
