//! In-memory document index.
//!
//! The indexer loads a provider's schema into an `ID => Document` map and a
//! `keyword => [Document]` map, answers scoped keyword queries, and fetches
//! bodies lazily through the provider on first read.
//!
//! # Search
//!
//! A query is a list of keywords, an optional list of scopes, and an
//! exact-match flag.
//!
//! 1. **Candidates.** Every keyword is lowercased and looked up in the
//!    keyword map. Buckets are unioned (OR semantics), de-duplicated by ID,
//!    in first-seen order. Title words are indexed alongside explicit
//!    keywords.
//! 2. **Scope filter.** The query context is the set of lowercased
//!    scopes, or the lowercased keywords when no scopes are given. A
//!    candidate passes when every one of its scopes is in the context, so
//!    without a file path `coding/go/*` guidelines surface only when both
//!    `coding` and `go` are mentioned. Root-level guidelines always pass.
//! 3. **Exact mode.** The document's scope set must equal the query's
//!    scope set.

use anyhow::{anyhow, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::{Document, IndexSchema, Status};
use crate::provider::Provider;

pub struct Indexer {
    provider: Arc<dyn Provider>,
    schema: IndexSchema,
    documents: HashMap<String, Arc<Document>>,
    /// IDs in load order.
    order: Vec<String>,
    keyword_index: HashMap<String, Vec<Arc<Document>>>,
    include_drafts: bool,
    errors: Vec<anyhow::Error>,
}

impl Indexer {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            schema: IndexSchema::default(),
            documents: HashMap::new(),
            order: Vec::new(),
            keyword_index: HashMap::new(),
            include_drafts: false,
            errors: Vec::new(),
        }
    }

    /// Include drafts in [`export`](Indexer::export).
    pub fn with_include_drafts(mut self, include: bool) -> Self {
        self.include_drafts = include;
        self
    }

    /// Load the provider's schema and build the index.
    ///
    /// Fatal provider failures are returned; non-fatal ones are kept in
    /// [`errors`](Indexer::errors) for the validator.
    pub async fn load(&mut self) -> Result<()> {
        let outcome = self.provider.load().await?;

        self.documents.clear();
        self.order.clear();
        self.keyword_index.clear();
        self.errors = outcome.errors;

        for entry in &outcome.schema.documents {
            self.add_document(Document::from_schema(entry.clone()));
        }
        self.schema = outcome.schema;

        info!(
            documents = self.documents.len(),
            keywords = self.keyword_index.len(),
            errors = self.errors.len(),
            "index loaded"
        );
        Ok(())
    }

    fn add_document(&mut self, doc: Document) {
        if let Some(existing) = self.documents.get(&doc.id) {
            self.errors.push(anyhow!(
                "duplicate document ID '{}' found in '{}' and '{}'",
                doc.id,
                existing.path,
                doc.path
            ));
            return;
        }

        let doc = Arc::new(doc);
        for key in index_keys(&doc) {
            self.keyword_index
                .entry(key)
                .or_default()
                .push(Arc::clone(&doc));
        }
        self.order.push(doc.id.clone());
        self.documents.insert(doc.id.clone(), doc);
    }

    /// Scoped keyword search. See the module documentation for the rules.
    pub fn search(
        &self,
        keywords: &[String],
        scopes: &[String],
        exact_scope_match: bool,
    ) -> Vec<Arc<Document>> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for keyword in keywords {
            let key = keyword.trim().to_lowercase();
            if let Some(bucket) = self.keyword_index.get(&key) {
                for doc in bucket {
                    if seen.insert(doc.id.as_str()) {
                        candidates.push(Arc::clone(doc));
                    }
                }
            }
        }

        let query_scopes: HashSet<String> = scopes.iter().map(|s| s.to_lowercase()).collect();

        let results: Vec<Arc<Document>> = if exact_scope_match {
            candidates
                .into_iter()
                .filter(|doc| doc.normalized_scopes().collect::<HashSet<_>>() == query_scopes)
                .collect()
        } else {
            let mut context = query_scopes;
            if context.is_empty() {
                context.extend(keywords.iter().map(|k| k.trim().to_lowercase()));
            }
            candidates
                .into_iter()
                .filter(|doc| doc.normalized_scopes().all(|s| context.contains(&s)))
                .collect()
        };

        debug!(
            keywords = ?keywords,
            scopes = ?scopes,
            exact = exact_scope_match,
            results = results.len(),
            "search"
        );
        results
    }

    /// All documents in load order.
    pub fn get_all(&self) -> Vec<Arc<Document>> {
        self.order
            .iter()
            .filter_map(|id| self.documents.get(id).cloned())
            .collect()
    }

    /// Look up a document, fetching and caching its body on first access.
    ///
    /// A failed fetch is logged and the document is returned with an empty
    /// body; a later call retries.
    pub async fn get_by_id(&self, id: &str) -> Option<Arc<Document>> {
        let doc = self.documents.get(id)?;
        if !doc.has_body() {
            match self.provider.fetch_document(&doc.id, &doc.path).await {
                Ok(body) => {
                    debug!(id = %doc.id, path = %doc.path, "body cached");
                    doc.cache_body(body);
                }
                Err(e) => {
                    let error = format!("{e:#}");
                    warn!(id = %doc.id, path = %doc.path, %error, "failed to fetch document body");
                }
            }
        }
        Some(Arc::clone(doc))
    }

    /// Schema suitable for publishing as `kex.json`: adopted documents only,
    /// unless drafts were explicitly included.
    pub fn export(&self) -> IndexSchema {
        let documents = self
            .get_all()
            .iter()
            .filter(|doc| self.include_drafts || doc.status == Status::Adopted)
            .map(|doc| doc.to_schema())
            .collect();
        IndexSchema::new(documents)
    }

    /// Non-fatal load errors.
    pub fn errors(&self) -> &[anyhow::Error] {
        &self.errors
    }

    /// The schema as returned by the provider.
    pub fn schema(&self) -> &IndexSchema {
        &self.schema
    }

    /// Documents indexed under `keyword` (case-insensitive).
    pub fn documents_for_keyword(&self, keyword: &str) -> &[Arc<Document>] {
        self.keyword_index
            .get(&keyword.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All keys of the keyword map.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.keyword_index.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Lowercased keywords plus title words, without duplicates.
fn index_keys(doc: &Document) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    let explicit = doc.keywords.iter().map(|k| k.trim().to_lowercase());
    let title_words = title_tokens(&doc.title);
    for key in explicit.chain(title_words) {
        if !key.is_empty() && !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

/// Title split on whitespace and punctuation, lowercased.
pub fn title_tokens(title: &str) -> impl Iterator<Item = String> + '_ {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}
