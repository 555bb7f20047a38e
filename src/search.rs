//! Document search.
//!
//! Maps the file an agent is working on to implicit scopes and queries the
//! [`Indexer`]. Used by the `search_documents` MCP tool and by
//! `kex search`.
//!
//! | Extension | Implicit scopes |
//! |-----------|-----------------|
//! | `.ts`, `.tsx`, `.js`, `.jsx` | `coding, typescript, javascript, frontend, vcs` |
//! | `.go` | `coding, go, backend, vcs` |
//! | `.md`, `.txt` | `documentation, vcs` |
//! | anything else | `coding, vcs` |

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::indexer::Indexer;
use crate::models::Document;

/// Text returned when a search has no results.
pub const NO_RESULTS: &str = "No matching documents found.";

/// Implicit scopes for a working file. Empty for an empty path.
pub fn scopes_for_path(file_path: &str) -> Vec<String> {
    if file_path.trim().is_empty() {
        return Vec::new();
    }

    let extension = Path::new(file_path)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let scopes: &[&str] = match extension.as_str() {
        "ts" | "tsx" | "js" | "jsx" => &["coding", "typescript", "javascript", "frontend", "vcs"],
        "go" => &["coding", "go", "backend", "vcs"],
        "md" | "txt" => &["documentation", "vcs"],
        _ => &["coding", "vcs"],
    };
    scopes.iter().map(|s| s.to_string()).collect()
}

/// The search use case over a shared index.
#[derive(Clone)]
pub struct SearchUseCase {
    indexer: Arc<Indexer>,
}

impl SearchUseCase {
    pub fn new(indexer: Arc<Indexer>) -> Self {
        Self { indexer }
    }

    pub fn execute(
        &self,
        keywords: &[String],
        file_path: Option<&str>,
        exact_scope_match: bool,
    ) -> Vec<Arc<Document>> {
        let scopes = scopes_for_path(file_path.unwrap_or(""));
        self.indexer.search(keywords, &scopes, exact_scope_match)
    }
}

/// Markdown list of results, one `- **title** (ID: `id`): description`
/// line per document.
pub fn format_results(documents: &[Arc<Document>]) -> String {
    if documents.is_empty() {
        return NO_RESULTS.to_string();
    }
    documents
        .iter()
        .map(|doc| format!("- **{}** (ID: `{}`): {}", doc.title, doc.id, doc.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// CLI entry point for `kex search`.
pub fn run_search(
    indexer: Arc<Indexer>,
    keywords: &[String],
    file_path: Option<&str>,
    exact: bool,
) -> Result<()> {
    let results = SearchUseCase::new(indexer).execute(keywords, file_path, exact);
    println!("{}", format_results(&results));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scopes_for_path() {
        assert_eq!(
            scopes_for_path("web/app.tsx"),
            vec!["coding", "typescript", "javascript", "frontend", "vcs"]
        );
        assert_eq!(scopes_for_path("cmd/main.go"), vec!["coding", "go", "backend", "vcs"]);
        assert_eq!(scopes_for_path("README.md"), vec!["documentation", "vcs"]);
        assert_eq!(scopes_for_path("notes.TXT"), vec!["documentation", "vcs"]);
        assert_eq!(scopes_for_path("src/lib.rs"), vec!["coding", "vcs"]);
        assert_eq!(scopes_for_path("Makefile"), vec!["coding", "vcs"]);
        assert!(scopes_for_path("").is_empty());
    }

    #[test]
    fn test_format_results() {
        assert_eq!(format_results(&[]), NO_RESULTS);

        let doc = Arc::new(Document {
            id: "coding.go.style".to_string(),
            title: "Go Style".to_string(),
            description: "How we write Go".to_string(),
            ..Default::default()
        });
        assert_eq!(
            format_results(&[doc]),
            "- **Go Style** (ID: `coding.go.style`): How we write Go"
        );
    }
}
