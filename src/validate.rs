//! Document validation.
//!
//! Runs a set of [`Rule`]s over every loaded document and produces a
//! [`ValidationReport`]. Errors on adopted documents make the report
//! invalid; errors on drafts are counted as warnings. Load errors (parse
//! failures, duplicate IDs) are reported as `global_errors` and also make
//! the report invalid.
//!
//! The same report backs `kex check` and the start gate of `kex start`.

use anyhow::{bail, Result};
use serde::Serialize;
use std::sync::Arc;

use crate::indexer::Indexer;
use crate::models::{Document, Status};
use crate::parser::{derive_id, file_stem};

/// Message printed when the start gate rejects the corpus.
pub const START_FAILURE: &str =
    "Failed to start due to document errors. Run 'kex check' for details.";

/// A single validation rule.
pub trait Rule: Send + Sync {
    fn name(&self) -> &str;

    /// Check one document. `Err` carries a human-readable message.
    fn check(&self, doc: &Document) -> Result<()>;
}

/// The document has an ID.
pub struct IdRequired;

impl Rule for IdRequired {
    fn name(&self) -> &str {
        "id-required"
    }

    fn check(&self, doc: &Document) -> Result<()> {
        if doc.id.trim().is_empty() {
            bail!("id is required");
        }
        Ok(())
    }
}

/// The document has a title.
pub struct TitleRequired;

impl Rule for TitleRequired {
    fn name(&self) -> &str {
        "title-required"
    }

    fn check(&self, doc: &Document) -> Result<()> {
        if doc.title.trim().is_empty() {
            bail!("title is required");
        }
        Ok(())
    }
}

/// The file name matches the ID, either exactly or as the last segment of
/// the path-derived dotted ID.
pub struct FilenameMatchesId;

impl Rule for FilenameMatchesId {
    fn name(&self) -> &str {
        "filename-matches-id"
    }

    fn check(&self, doc: &Document) -> Result<()> {
        if doc.id.is_empty() || doc.path.is_empty() {
            return Ok(());
        }
        let stem = file_stem(&doc.path);
        if doc.id == stem || doc.id == derive_id(&doc.path) {
            return Ok(());
        }
        bail!(
            "filename '{}' does not match id '{}'",
            stem,
            doc.id
        );
    }
}

/// Per-document result.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub id: String,
    pub path: String,
    pub status: Status,
    pub errors: Vec<String>,
}

/// Aggregate counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub adopted: usize,
    pub draft: usize,
    pub adopted_errors: usize,
    pub draft_warnings: usize,
    pub parse_errors: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub summary: ReportSummary,
    pub documents: Vec<DocumentReport>,
    pub global_errors: Vec<String>,
}

impl ValidationReport {
    /// Whether a server may start on this corpus.
    pub fn passes_start_gate(&self) -> bool {
        self.valid && self.global_errors.is_empty()
    }

    /// Every error in the report, prefixed with its document.
    pub fn error_messages(&self) -> Vec<String> {
        let mut messages = self.global_errors.clone();
        for doc in &self.documents {
            if doc.status == Status::Adopted {
                for error in &doc.errors {
                    messages.push(format!("{} ({}): {}", doc.id, doc.path, error));
                }
            }
        }
        messages
    }
}

pub struct Validator {
    rules: Vec<Box<dyn Rule>>,
}

impl Validator {
    /// A validator with the built-in rules.
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(IdRequired),
                Box::new(TitleRequired),
                Box::new(FilenameMatchesId),
            ],
        }
    }

    pub fn with_rule(mut self, rule: Box<dyn Rule>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn validate_document(&self, doc: &Document) -> DocumentReport {
        let errors = self
            .rules
            .iter()
            .filter_map(|rule| rule.check(doc).err())
            .map(|e| e.to_string())
            .collect();
        DocumentReport {
            id: doc.id.clone(),
            path: doc.path.clone(),
            status: doc.status,
            errors,
        }
    }

    pub fn validate(&self, indexer: &Indexer) -> ValidationReport {
        let mut documents: Vec<Arc<Document>> = indexer.get_all();
        documents.sort_by(|a, b| a.id.cmp(&b.id));

        let global_errors: Vec<String> = indexer.errors().iter().map(|e| format!("{e:#}")).collect();

        let mut summary = ReportSummary {
            total: documents.len(),
            parse_errors: global_errors.len(),
            ..Default::default()
        };

        let reports: Vec<DocumentReport> = documents
            .iter()
            .map(|doc| {
                let report = self.validate_document(doc);
                match report.status {
                    Status::Adopted => {
                        summary.adopted += 1;
                        summary.adopted_errors += report.errors.len();
                    }
                    Status::Draft => {
                        summary.draft += 1;
                        summary.draft_warnings += report.errors.len();
                    }
                }
                report
            })
            .collect();

        ValidationReport {
            valid: summary.adopted_errors == 0 && summary.parse_errors == 0,
            summary,
            documents: reports,
            global_errors,
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

/// CLI entry point for `kex check`. Exits with status 1 when invalid.
pub fn run_check(indexer: &Indexer, json: bool) -> Result<()> {
    let report = Validator::new().validate(indexer);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.valid {
        std::process::exit(1);
    }
    Ok(())
}

fn print_report(report: &ValidationReport) {
    for error in &report.global_errors {
        println!("ERROR   {}", error);
    }
    for doc in &report.documents {
        let label = match doc.status {
            Status::Adopted => "ERROR  ",
            Status::Draft => "WARNING",
        };
        for error in &doc.errors {
            println!("{} {} ({}): {}", label, doc.id, doc.path, error);
        }
    }

    let s = &report.summary;
    println!();
    println!(
        "documents: {}  adopted: {}  draft: {}",
        s.total, s.adopted, s.draft
    );
    println!(
        "errors: {}  warnings: {}  parse errors: {}",
        s.adopted_errors, s.draft_warnings, s.parse_errors
    );
    println!("{}", if report.valid { "ok" } else { "invalid" });
}
