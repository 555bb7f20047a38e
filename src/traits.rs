//! MCP tools.
//!
//! Every tool served over MCP implements [`Tool`] and is registered in a
//! [`ToolRegistry`]. The built-in registry holds exactly two tools:
//!
//! | Tool | Arguments | Result |
//! |------|-----------|--------|
//! | `search_documents` | `keywords` (required), `filePath`, `exactScopeMatch` | Markdown list of matches |
//! | `read_document` | `id` (required) | `# <title>\n\n<body>` |
//!
//! Tools receive a [`ToolContext`] bridging to the search and retrieve use
//! cases over the shared index.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

use crate::get::{render_document, RetrieveUseCase, NOT_FOUND};
use crate::indexer::Indexer;
use crate::search::{format_results, SearchUseCase};

/// Failure of a tool call.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments did not match the tool's input schema.
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// One content block of a tool result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

/// Result of a tool call: `{content: [{type: "text", text}], isError?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallToolResult {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError", skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl CallToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent {
                kind: "text".to_string(),
                text: text.into(),
            }],
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::text(text)
        }
    }

    /// Text of the first content block.
    pub fn first_text(&self) -> &str {
        self.content.first().map(|c| c.text.as_str()).unwrap_or("")
    }
}

/// A tool that agents can discover through `tools/list` and invoke through
/// `tools/call`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name used in `tools/call`.
    fn name(&self) -> &str;

    /// One-line description for agent discovery.
    fn description(&self) -> &str;

    /// JSON Schema of the `arguments` object.
    fn input_schema(&self) -> Value;

    async fn execute(&self, arguments: Value, ctx: &ToolContext)
        -> Result<CallToolResult, ToolError>;

    /// Descriptor returned by `tools/list`.
    fn descriptor(&self) -> Value {
        json!({
            "name": self.name(),
            "description": self.description(),
            "inputSchema": self.input_schema(),
        })
    }
}

/// Bridge from tools to the index.
#[derive(Clone)]
pub struct ToolContext {
    search: SearchUseCase,
    retrieve: RetrieveUseCase,
}

impl ToolContext {
    pub fn new(indexer: Arc<Indexer>) -> Self {
        Self {
            search: SearchUseCase::new(Arc::clone(&indexer)),
            retrieve: RetrieveUseCase::new(indexer),
        }
    }

    pub fn search(&self) -> &SearchUseCase {
        &self.search
    }

    pub fn retrieve(&self) -> &RetrieveUseCase {
        &self.retrieve
    }
}

fn parse_arguments<T: for<'de> Deserialize<'de>>(arguments: Value) -> Result<T, ToolError> {
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidParams(e.to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchArgs {
    keywords: Vec<String>,
    #[serde(default)]
    file_path: Option<String>,
    #[serde(default)]
    exact_scope_match: bool,
}

/// Keyword search scoped by the agent's working file.
pub struct SearchDocumentsTool;

#[async_trait]
impl Tool for SearchDocumentsTool {
    fn name(&self) -> &str {
        "search_documents"
    }

    fn description(&self) -> &str {
        "Search project guidelines by keywords. Pass the path of the file you are working on \
         as filePath so that guidelines for its language and area are included."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "keywords": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Keywords describing the task (e.g. [\"error\", \"handling\"])"
                },
                "filePath": {
                    "type": "string",
                    "description": "Path of the file being edited; used to infer scopes"
                },
                "exactScopeMatch": {
                    "type": "boolean",
                    "description": "Only return documents whose scopes equal the inferred scopes"
                }
            },
            "required": ["keywords"]
        })
    }

    async fn execute(
        &self,
        arguments: Value,
        ctx: &ToolContext,
    ) -> Result<CallToolResult, ToolError> {
        let args: SearchArgs = parse_arguments(arguments)?;
        let results = ctx.search().execute(
            &args.keywords,
            args.file_path.as_deref(),
            args.exact_scope_match,
        );
        Ok(CallToolResult::text(format_results(&results)))
    }
}

#[derive(Debug, Deserialize)]
struct ReadArgs {
    id: String,
}

/// Full document body by ID.
pub struct ReadDocumentTool;

#[async_trait]
impl Tool for ReadDocumentTool {
    fn name(&self) -> &str {
        "read_document"
    }

    fn description(&self) -> &str {
        "Read the full content of a guideline by its ID, as returned by search_documents."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "Document ID" }
            },
            "required": ["id"]
        })
    }

    async fn execute(
        &self,
        arguments: Value,
        ctx: &ToolContext,
    ) -> Result<CallToolResult, ToolError> {
        let args: ReadArgs = parse_arguments(arguments)?;
        let result = ctx.retrieve().execute(&args.id).await;
        Ok(match result.document {
            Some(doc) => CallToolResult::text(render_document(&doc)),
            None => CallToolResult::error(NOT_FOUND),
        })
    }
}

/// Registry of tools served over MCP.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// `search_documents` and `read_document`, in that order.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SearchDocumentsTool));
        registry.register(Box::new(ReadDocumentTool));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// `{"tools": [...]}` payload for `tools/list`.
    pub fn list(&self) -> Value {
        let tools: Vec<Value> = self.tools.iter().map(|t| t.descriptor()).collect();
        json!({ "tools": tools })
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
