//! Filesystem provider.
//!
//! Walks a local directory tree and parses every `.md` file into a schema
//! entry. Hidden directories below the root (`.git`, `.cache`, ...) are
//! skipped. Paths in the schema are relative to the root and use forward
//! slashes.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::models::IndexSchema;
use crate::parser::{parse_file, strip_frontmatter};
use crate::provider::{LoadOutcome, Provider};

/// Provider backed by a local directory of markdown files.
#[derive(Debug, Clone)]
pub struct FilesystemProvider {
    root: PathBuf,
}

impl FilesystemProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All `.md` files under the root, sorted by path.
    fn scan(&self, errors: &mut Vec<anyhow::Error>) -> Vec<PathBuf> {
        let mut files = Vec::new();

        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden_dir(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    errors.push(anyhow::Error::new(e).context(format!(
                        "failed to walk {}",
                        self.root.display()
                    )));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let is_markdown = entry
                .path()
                .extension()
                .is_some_and(|ext| ext == "md");
            if is_markdown {
                files.push(entry.into_path());
            }
        }

        files
    }
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry.file_name().to_string_lossy().starts_with('.')
}

#[async_trait]
impl Provider for FilesystemProvider {
    fn name(&self) -> String {
        format!("filesystem:{}", self.root.display())
    }

    async fn load(&self) -> Result<LoadOutcome> {
        if !self.root.is_dir() {
            bail!("source directory does not exist: {}", self.root.display());
        }

        let mut errors = Vec::new();
        let files = self.scan(&mut errors);
        let mut documents = Vec::with_capacity(files.len());

        for file in files {
            match parse_file(&file, &self.root) {
                Ok(doc) => documents.push(doc.to_schema()),
                Err(e) => {
                    warn!(path = %file.display(), error = %e, "skipping document");
                    errors.push(anyhow::Error::new(e).context(format!(
                        "failed to parse {}",
                        file.display()
                    )));
                }
            }
        }

        debug!(
            provider = %self.name(),
            documents = documents.len(),
            errors = errors.len(),
            "filesystem load complete"
        );

        Ok(LoadOutcome {
            schema: IndexSchema::new(documents),
            errors,
        })
    }

    async fn fetch_content(&self, path: &str) -> Result<String> {
        let full = self.root.join(path);
        let content = tokio::fs::read_to_string(&full)
            .await
            .with_context(|| format!("failed to read {}", full.display()))?;
        Ok(strip_frontmatter(&content))
    }
}
