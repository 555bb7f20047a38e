//! Markdown front-matter parsing.
//!
//! A guideline file starts with a `---` line, followed by a YAML block,
//! a closing `---` line, and the markdown body:
//!
//! ```text
//! ---
//! title: Go Style
//! keywords: [go, style]
//! ---
//! Body text...
//! ```
//!
//! The ID and scopes are derived from the file's location relative to its
//! source root: `coding/go/style.md` yields scopes `["coding", "go"]` and
//! ID `coding.go.style`. An explicit `id:` overrides the derived ID; scopes
//! always come from the path.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path};
use thiserror::Error;

use crate::models::{Document, Source, Status};

const OPEN_DELIMITER: &str = "---\n";
const CLOSE_DELIMITER: &str = "\n---\n";

/// Failure to parse a guideline file.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("missing frontmatter")]
    MissingFrontmatter,
    #[error("invalid frontmatter format")]
    InvalidFormat,
    #[error("failed to parse frontmatter: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Recognized front-matter keys. Anything else is ignored.
#[derive(Debug, Default, Deserialize)]
struct FrontMatter {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    keywords: Option<Vec<String>>,
    #[serde(default)]
    status: Option<Status>,
    #[serde(default)]
    source: Option<Source>,
}

#[derive(Serialize)]
struct FrontMatterOut<'a> {
    id: &'a str,
    title: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'a str,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    keywords: &'a [String],
    status: Status,
    #[serde(skip_serializing_if = "Source::is_empty")]
    source: &'a Source,
}

/// Parse the file at `path`, deriving ID and scopes relative to `root`.
pub fn parse_file(path: &Path, root: &Path) -> Result<Document, ParseError> {
    let content = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let relative = path.strip_prefix(root).unwrap_or(path);
    parse_document(&content, &relative_path_string(relative))
}

/// Parse markdown `content` whose provider-relative path is `rel_path`
/// (forward-slash separated). The body is populated on the result.
pub fn parse_document(content: &str, rel_path: &str) -> Result<Document, ParseError> {
    let (yaml, body) = split_frontmatter(content)?;

    let front: FrontMatter = if yaml.trim().is_empty() {
        FrontMatter::default()
    } else {
        serde_yaml::from_str(&yaml)?
    };

    let scopes = derive_scopes(rel_path);
    let id = match front.id {
        Some(id) if !id.trim().is_empty() => id,
        _ => derive_id(rel_path),
    };

    let doc = Document {
        id,
        title: front.title.unwrap_or_default(),
        description: front.description.unwrap_or_default(),
        keywords: front.keywords.unwrap_or_default(),
        scopes,
        status: front.status.unwrap_or_default(),
        source: front.source.unwrap_or_default(),
        path: rel_path.to_string(),
        ..Default::default()
    };
    Ok(doc.with_body(body))
}

/// Remove the front-matter block and return the body.
///
/// Content that does not start with a front-matter block is returned
/// unchanged.
pub fn strip_frontmatter(content: &str) -> String {
    match split_frontmatter(content) {
        Ok((_, body)) => body,
        Err(_) => normalize_newlines(content),
    }
}

/// Render a document back to front-matter + body.
pub fn serialize(doc: &Document) -> Result<String, ParseError> {
    let front = FrontMatterOut {
        id: &doc.id,
        title: &doc.title,
        description: &doc.description,
        keywords: &doc.keywords,
        status: doc.status,
        source: &doc.source,
    };
    let yaml = serde_yaml::to_string(&front)?;
    Ok(format!("{OPEN_DELIMITER}{yaml}---\n{}", doc.body()))
}

/// Directory segments of `rel_path`, excluding the file name.
pub fn derive_scopes(rel_path: &str) -> Vec<String> {
    let mut segments: Vec<String> = rel_path
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .map(str::to_string)
        .collect();
    segments.pop();
    segments
}

/// `dir1.dir2.basename` for `dir1/dir2/basename.md`.
pub fn derive_id(rel_path: &str) -> String {
    let mut parts = derive_scopes(rel_path);
    parts.push(file_stem(rel_path));
    parts.join(".")
}

/// File name of `rel_path` without its extension.
pub fn file_stem(rel_path: &str) -> String {
    let name = rel_path.rsplit('/').next().unwrap_or(rel_path);
    match name.rfind('.') {
        Some(idx) if idx > 0 => name[..idx].to_string(),
        _ => name.to_string(),
    }
}

/// Forward-slash representation of a relative path, independent of platform.
pub fn relative_path_string(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn normalize_newlines(content: &str) -> String {
    content.replace("\r\n", "\n")
}

fn split_frontmatter(content: &str) -> Result<(String, String), ParseError> {
    let normalized = normalize_newlines(content);
    let (yaml, body) = split_normalized(&normalized)?;
    Ok((yaml.to_string(), body.to_string()))
}

fn split_normalized(content: &str) -> Result<(&str, &str), ParseError> {
    let rest = content
        .strip_prefix(OPEN_DELIMITER)
        .ok_or(ParseError::MissingFrontmatter)?;

    if let Some(body) = rest.strip_prefix(OPEN_DELIMITER) {
        return Ok(("", body));
    }

    match rest.find(CLOSE_DELIMITER) {
        Some(idx) => Ok((&rest[..idx], &rest[idx + CLOSE_DELIMITER.len()..])),
        None => match rest.strip_suffix("\n---") {
            Some(yaml) => Ok((yaml, "")),
            None => Err(ParseError::InvalidFormat),
        },
    }
}
