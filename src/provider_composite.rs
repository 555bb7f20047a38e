//! Composite provider.
//!
//! Loads an ordered list of providers into a single schema. Document IDs
//! must be unique across the whole corpus: the first provider to yield an
//! ID keeps it, and later occurrences are dropped with a non-fatal error.
//! Body fetches are routed by document ID back to the provider that
//! produced the document, since two roots may hold the same relative path.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, warn};

use crate::models::IndexSchema;
use crate::provider::{LoadOutcome, Provider};

pub struct CompositeProvider {
    providers: Vec<Box<dyn Provider>>,
    /// Document ID => index into `providers`.
    origins: RwLock<HashMap<String, usize>>,
}

impl CompositeProvider {
    pub fn new(providers: Vec<Box<dyn Provider>>) -> Self {
        Self {
            providers,
            origins: RwLock::new(HashMap::new()),
        }
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    fn origin_of(&self, id: &str) -> Option<usize> {
        self.origins
            .read()
            .ok()
            .and_then(|map| map.get(id).copied())
    }
}

#[async_trait]
impl Provider for CompositeProvider {
    fn name(&self) -> String {
        format!("composite[{}]", self.provider_names().join(", "))
    }

    async fn load(&self) -> Result<LoadOutcome> {
        let mut documents = Vec::new();
        let mut errors = Vec::new();
        let mut seen_ids: HashMap<String, String> = HashMap::new();
        let mut origins: HashMap<String, usize> = HashMap::new();

        for (index, provider) in self.providers.iter().enumerate() {
            let outcome = provider
                .load()
                .await
                .with_context(|| format!("failed to load {}", provider.name()))?;
            errors.extend(outcome.errors);

            for doc in outcome.schema.documents {
                if let Some(origin) = seen_ids.get(&doc.id) {
                    warn!(id = %doc.id, first = %origin, duplicate = %doc.path, "duplicate document ID");
                    errors.push(anyhow!(
                        "duplicate document ID '{}' found in '{}' and '{}'",
                        doc.id,
                        origin,
                        doc.path
                    ));
                    continue;
                }
                seen_ids.insert(doc.id.clone(), doc.path.clone());
                origins.insert(doc.id.clone(), index);
                documents.push(doc);
            }
        }

        debug!(
            providers = self.providers.len(),
            documents = documents.len(),
            errors = errors.len(),
            "composite load complete"
        );

        if let Ok(mut map) = self.origins.write() {
            *map = origins;
        }

        Ok(LoadOutcome {
            schema: IndexSchema::new(documents),
            errors,
        })
    }

    async fn fetch_document(&self, id: &str, path: &str) -> Result<String> {
        match self.origin_of(id).and_then(|index| self.providers.get(index)) {
            Some(provider) => provider.fetch_document(id, path).await,
            None => self.fetch_content(path).await,
        }
    }

    /// Fetch by path alone: providers are tried in order.
    async fn fetch_content(&self, path: &str) -> Result<String> {
        let mut last_error = None;
        for provider in &self.providers {
            match provider.fetch_content(path).await {
                Ok(body) => return Ok(body),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow!("no provider could fetch '{}'", path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentSchema;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StaticProvider {
        label: &'static str,
        docs: Vec<(&'static str, &'static str)>,
        fetches: Arc<AtomicUsize>,
    }

    impl StaticProvider {
        fn new(label: &'static str, docs: Vec<(&'static str, &'static str)>) -> Self {
            Self {
                label,
                docs,
                fetches: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl Provider for StaticProvider {
        fn name(&self) -> String {
            self.label.to_string()
        }

        async fn load(&self) -> Result<LoadOutcome> {
            let documents = self
                .docs
                .iter()
                .map(|(id, path)| DocumentSchema {
                    id: id.to_string(),
                    title: id.to_uppercase(),
                    path: path.to_string(),
                    ..Default::default()
                })
                .collect();
            Ok(LoadOutcome::new(IndexSchema::new(documents)))
        }

        async fn fetch_content(&self, path: &str) -> Result<String> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.docs.iter().any(|(_, p)| *p == path) {
                Ok(format!("{} from {}", path, self.label))
            } else {
                Err(anyhow!("{} not in {}", path, self.label))
            }
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl Provider for FailingProvider {
        fn name(&self) -> String {
            "failing".to_string()
        }

        async fn load(&self) -> Result<LoadOutcome> {
            Err(anyhow!("unreachable"))
        }

        async fn fetch_content(&self, _path: &str) -> Result<String> {
            Err(anyhow!("unreachable"))
        }
    }

    #[tokio::test]
    async fn test_duplicate_id_first_wins() {
        let composite = CompositeProvider::new(vec![
            Box::new(StaticProvider::new("a", vec![("DUP", "one.md"), ("a1", "a1.md")])),
            Box::new(StaticProvider::new("b", vec![("DUP", "two.md"), ("b1", "b1.md")])),
        ]);

        let outcome = composite.load().await.unwrap();
        let ids: Vec<_> = outcome.schema.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["DUP", "a1", "b1"]);
        assert_eq!(outcome.schema.documents[0].path, "one.md");

        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(
            outcome.errors[0].to_string(),
            "duplicate document ID 'DUP' found in 'one.md' and 'two.md'"
        );
    }

    #[tokio::test]
    async fn test_fetch_routes_to_origin() {
        let a = StaticProvider::new("a", vec![("a1", "a1.md")]);
        let b = StaticProvider::new("b", vec![("b1", "b1.md")]);
        let a_fetches = a.fetches.clone();
        let composite = CompositeProvider::new(vec![Box::new(a), Box::new(b)]);
        composite.load().await.unwrap();

        assert_eq!(composite.fetch_document("b1", "b1.md").await.unwrap(), "b1.md from b");
        assert_eq!(a_fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_same_path_in_two_roots_routes_by_id() {
        let a = StaticProvider::new("a", vec![("rule", "rule.md")]);
        let b = StaticProvider::new("b", vec![("other", "rule.md")]);
        let a_fetches = a.fetches.clone();
        let composite = CompositeProvider::new(vec![Box::new(a), Box::new(b)]);
        let outcome = composite.load().await.unwrap();
        assert_eq!(outcome.schema.documents.len(), 2);
        assert!(outcome.errors.is_empty());

        assert_eq!(composite.fetch_document("other", "rule.md").await.unwrap(), "rule.md from b");
        assert_eq!(a_fetches.load(Ordering::SeqCst), 0);
        assert_eq!(composite.fetch_document("rule", "rule.md").await.unwrap(), "rule.md from a");
    }

    #[tokio::test]
    async fn test_fetch_without_load_falls_back_in_order() {
        let composite = CompositeProvider::new(vec![
            Box::new(StaticProvider::new("a", vec![("a1", "a1.md")])),
            Box::new(StaticProvider::new("b", vec![("b1", "b1.md")])),
        ]);
        assert_eq!(composite.fetch_content("b1.md").await.unwrap(), "b1.md from b");
        assert!(composite.fetch_content("zzz.md").await.is_err());
    }

    #[tokio::test]
    async fn test_fatal_child_load_is_fatal() {
        let composite = CompositeProvider::new(vec![
            Box::new(StaticProvider::new("a", vec![("a1", "a1.md")])),
            Box::new(FailingProvider),
        ]);
        assert!(composite.load().await.is_err());
    }

    #[tokio::test]
    async fn test_empty_composite() {
        let composite = CompositeProvider::new(Vec::new());
        assert!(composite.is_empty());
        let outcome = composite.load().await.unwrap();
        assert!(outcome.schema.documents.is_empty());
        assert!(composite.fetch_content("x.md").await.is_err());
    }
}
