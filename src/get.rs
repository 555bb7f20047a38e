//! Document retrieval by ID.
//!
//! Resolves an ID to a document with its body loaded. Used by the
//! `read_document` MCP tool and by `kex get`.

use anyhow::Result;
use std::sync::Arc;

use crate::indexer::Indexer;
use crate::models::Document;

/// Text returned when an ID is unknown.
pub const NOT_FOUND: &str = "Document not found.";

/// Outcome of a retrieval.
#[derive(Debug, Clone)]
pub struct RetrieveResult {
    pub document: Option<Arc<Document>>,
    pub found: bool,
}

#[derive(Clone)]
pub struct RetrieveUseCase {
    indexer: Arc<Indexer>,
}

impl RetrieveUseCase {
    pub fn new(indexer: Arc<Indexer>) -> Self {
        Self { indexer }
    }

    pub async fn execute(&self, id: &str) -> RetrieveResult {
        let document = self.indexer.get_by_id(id).await;
        RetrieveResult {
            found: document.is_some(),
            document,
        }
    }
}

/// `# <title>\n\n<body>`
pub fn render_document(doc: &Document) -> String {
    format!("# {}\n\n{}", doc.title, doc.body())
}

/// CLI entry point for `kex get`. Exits with status 1 on an unknown ID.
pub async fn run_get(indexer: Arc<Indexer>, id: &str) -> Result<()> {
    let result = RetrieveUseCase::new(indexer).execute(id).await;
    match result.document {
        Some(doc) => {
            println!("{}", render_document(&doc));
            Ok(())
        }
        None => {
            eprintln!("{}", NOT_FOUND);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_document() {
        let doc = Document {
            title: "Go Style".to_string(),
            ..Default::default()
        }
        .with_body("Use gofmt.");
        assert_eq!(render_document(&doc), "# Go Style\n\nUse gofmt.");
    }
}
