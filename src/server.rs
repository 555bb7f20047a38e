//! MCP server over stdio.
//!
//! Speaks newline-delimited JSON-RPC 2.0: one JSON object per line on
//! stdin, one response per line on stdout. Requests are handled strictly
//! one at a time, so responses come back in request order. Logs go to
//! stderr; nothing but protocol messages is written to stdout.
//!
//! # Methods
//!
//! | Method | Result |
//! |--------|--------|
//! | `initialize` | Protocol version, server info, capabilities |
//! | `notifications/initialized` | (notification, no response) |
//! | `ping` | `{}` |
//! | `tools/list` | The [`ToolRegistry`] descriptors |
//! | `tools/call` | A [`CallToolResult`](crate::traits::CallToolResult) |
//!
//! # Errors
//!
//! | Code | Message | When |
//! |------|---------|------|
//! | `-32601` | `Method not found` | Unknown method on a request with an `id` |
//! | `-32700` | `Invalid params` | Malformed `tools/call` params or tool arguments |
//! | `-32601` | `Tool not found` | Unknown tool name |
//! | `-32603` | `Internal error` | A tool failed |
//!
//! Lines that are not valid JSON-RPC are logged and skipped without a
//! response. Requests without an `id` are notifications and are never
//! answered.
//!
//! # Client configuration
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "kex": { "command": "kex", "args": ["start"] }
//!   }
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::indexer::Indexer;
use crate::traits::{ToolContext, ToolError, ToolRegistry};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "kex";
pub const SERVER_VERSION: &str = "1.0.0";

pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32700;
pub const INTERNAL_ERROR: i64 = -32603;

/// Lifecycle of the stdio connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    AwaitingInitialize,
    Ready,
    Closed,
}

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    method: String,
    #[serde(default)]
    params: Option<Value>,
    /// Kept as raw JSON so it is echoed byte-for-byte. Absent means
    /// notification; an explicit `null` is a request.
    #[serde(default, deserialize_with = "raw_id")]
    id: Option<Box<RawValue>>,
}

fn raw_id<'de, D>(deserializer: D) -> std::result::Result<Option<Box<RawValue>>, D::Error>
where
    D: Deserializer<'de>,
{
    Box::<RawValue>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse<'a> {
    jsonrpc: &'static str,
    id: &'a RawValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl JsonRpcError {
    fn new(code: i64, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            data: None,
        }
    }

    fn method_not_found() -> Self {
        Self::new(METHOD_NOT_FOUND, "Method not found")
    }

    fn invalid_params() -> Self {
        Self::new(INVALID_PARAMS, "Invalid params")
    }

    fn tool_not_found() -> Self {
        Self::new(METHOD_NOT_FOUND, "Tool not found")
    }
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// The MCP dispatcher.
pub struct McpServer {
    tools: ToolRegistry,
    ctx: ToolContext,
    state: ConnectionState,
}

impl McpServer {
    /// A server exposing the built-in tools over `indexer`.
    pub fn new(indexer: Arc<Indexer>) -> Self {
        Self::with_tools(indexer, ToolRegistry::with_builtins())
    }

    pub fn with_tools(indexer: Arc<Indexer>, tools: ToolRegistry) -> Self {
        Self {
            tools,
            ctx: ToolContext::new(indexer),
            state: ConnectionState::AwaitingInitialize,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Handle one input line. Returns the response line, if any.
    pub async fn handle_line(&mut self, line: &str) -> Option<String> {
        self.handle_message(line.as_bytes()).await
    }

    async fn handle_message(&mut self, message: &[u8]) -> Option<String> {
        let request: JsonRpcRequest = match serde_json::from_slice(message) {
            Ok(request) => request,
            Err(e) => {
                error!(error = %e, "failed to parse JSON-RPC request");
                return None;
            }
        };

        debug!(method = %request.method, "request");

        let Some(id) = request.id.as_deref() else {
            if request.method != "notifications/initialized" {
                debug!(method = %request.method, "ignoring notification");
            }
            return None;
        };

        let outcome = self.dispatch(&request.method, request.params).await;
        if request.method == "initialize" && outcome.is_ok() {
            self.state = ConnectionState::Ready;
        }

        let response = match outcome {
            Ok(result) => JsonRpcResponse {
                jsonrpc: "2.0",
                id,
                result: Some(result),
                error: None,
            },
            Err(error) => JsonRpcResponse {
                jsonrpc: "2.0",
                id,
                result: None,
                error: Some(error),
            },
        };

        match serde_json::to_string(&response) {
            Ok(json) => Some(json),
            Err(e) => {
                error!(error = %e, "failed to serialize response");
                None
            }
        }
    }

    async fn dispatch(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> std::result::Result<Value, JsonRpcError> {
        match method {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION },
                "capabilities": { "tools": {} }
            })),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.tools.list()),
            "tools/call" => self.call_tool(params).await,
            _ => {
                warn!(method = %method, "method not found");
                Err(JsonRpcError::method_not_found())
            }
        }
    }

    async fn call_tool(&self, params: Option<Value>) -> std::result::Result<Value, JsonRpcError> {
        let params: CallToolParams = params
            .and_then(|p| serde_json::from_value(p).ok())
            .ok_or_else(JsonRpcError::invalid_params)?;

        let tool = self
            .tools
            .find(&params.name)
            .ok_or_else(JsonRpcError::tool_not_found)?;

        match tool.execute(params.arguments, &self.ctx).await {
            Ok(result) => serde_json::to_value(result).map_err(|e| JsonRpcError {
                data: Some(Value::String(e.to_string())),
                ..JsonRpcError::new(INTERNAL_ERROR, "Internal error")
            }),
            Err(ToolError::InvalidParams(message)) => {
                debug!(tool = %params.name, %message, "invalid tool arguments");
                Err(JsonRpcError::invalid_params())
            }
            Err(ToolError::Internal(e)) => {
                let message = format!("{e:#}");
                error!(tool = %params.name, error = %message, "tool failed");
                Err(JsonRpcError {
                    data: Some(Value::String(message)),
                    ..JsonRpcError::new(INTERNAL_ERROR, "Internal error")
                })
            }
        }
    }

    /// Serve requests from `reader` until EOF, writing responses to `writer`.
    ///
    /// Only a read or write failure is returned as an error.
    pub async fn serve<R, W>(&mut self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        // Raw bytes: a line that is not UTF-8 is a bad request, not a read failure.
        let mut line = Vec::new();
        loop {
            line.clear();
            let read = reader
                .read_until(b'\n', &mut line)
                .await
                .context("Failed to read from stdin")?;
            if read == 0 {
                break;
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            if let Some(response) = self.handle_message(&line).await {
                writer.write_all(response.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }
        self.state = ConnectionState::Closed;
        info!("stdin closed, shutting down");
        Ok(())
    }
}

/// Serve MCP on the process's stdin/stdout.
pub async fn run_stdio(indexer: Arc<Indexer>) -> Result<()> {
    info!(documents = indexer.len(), "MCP server listening on stdio");
    let mut server = McpServer::new(indexer);
    server
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
}
