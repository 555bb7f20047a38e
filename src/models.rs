//! Core data models used throughout kex.
//!
//! [`Document`] is the in-memory entity served to agents. [`IndexSchema`]
//! and [`DocumentSchema`] are the interchange form exchanged between
//! providers and the indexer, and served as `kex.json` to remote consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Lifecycle status of a guideline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Draft,
    #[default]
    Adopted,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Draft => "draft",
            Status::Adopted => "adopted",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upstream reference for a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Source {
    pub fn is_empty(&self) -> bool {
        self.url.is_none()
    }
}

/// A guideline loaded into the index.
///
/// Everything except the body is fixed at load time. The body is fetched
/// from the owning provider on first read and cached for the lifetime of
/// the process; the cell is write-once so concurrent first reads agree.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Keywords in their original case. Matching is case-insensitive.
    pub keywords: Vec<String>,
    /// Directory segments from the provider root to the file.
    pub scopes: Vec<String>,
    pub status: Status,
    pub source: Source,
    /// Provider-relative locator used for body fetches.
    pub path: String,
    pub(crate) body: OnceLock<String>,
}

impl Document {
    /// Returns the cached body, or `""` if it has not been fetched yet.
    pub fn body(&self) -> &str {
        self.body.get().map(String::as_str).unwrap_or("")
    }

    /// Whether a body has been cached.
    pub fn has_body(&self) -> bool {
        self.body.get().is_some()
    }

    /// Caches the body. A body that is already cached is kept.
    ///
    /// Returns the cached value after the call.
    pub fn cache_body(&self, body: String) -> &str {
        self.body.get_or_init(|| body)
    }

    /// Builds a document with a pre-populated body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = OnceLock::from(body.into());
        self
    }

    /// Lowercased scope strings, for comparison.
    pub fn normalized_scopes(&self) -> impl Iterator<Item = String> + '_ {
        self.scopes.iter().map(|s| s.to_lowercase())
    }

    /// Converts the interchange form into an index document.
    pub fn from_schema(schema: DocumentSchema) -> Self {
        Self {
            id: schema.id,
            title: schema.title,
            description: schema.description,
            keywords: schema.keywords,
            scopes: schema.scopes,
            status: schema.status.unwrap_or_default(),
            source: schema.source.unwrap_or_default(),
            path: schema.path,
            body: OnceLock::new(),
        }
    }

    /// Converts back to the interchange form (without the body).
    pub fn to_schema(&self) -> DocumentSchema {
        DocumentSchema {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            keywords: self.keywords.clone(),
            scopes: self.scopes.clone(),
            status: Some(self.status),
            source: (!self.source.is_empty()).then(|| self.source.clone()),
            path: self.path.clone(),
        }
    }
}

/// A document entry in `kex.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSchema {
    /// Empty when the entry has none; reported by the validator.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Absent in some remote indexes; treated as adopted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(default)]
    pub path: String,
}

/// The document index exchanged between providers and the indexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    #[serde(default = "Utc::now")]
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub documents: Vec<DocumentSchema>,
}

impl IndexSchema {
    pub fn new(documents: Vec<DocumentSchema>) -> Self {
        Self {
            generated_at: Utc::now(),
            documents,
        }
    }
}

impl Default for IndexSchema {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
