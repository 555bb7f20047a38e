//! # kex
//!
//! Serves a project-local corpus of markdown guidelines to AI coding agents
//! over MCP (line-delimited JSON-RPC on stdio).
//!
//! Guidelines are markdown files with YAML front-matter. They are collected
//! from local directories and remote `kex.json` indexes, merged into one
//! in-memory keyword index, and exposed through two tools:
//! `search_documents` and `read_document`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────┐   ┌──────────┐
//! │  Providers   │──▶│ Composite │──▶│ Indexer  │
//! │ local/remote │   │  (merge)  │   │ keywords │
//! └──────────────┘   └───────────┘   └────┬─────┘
//!                                         │
//!                     ┌───────────────────┤
//!                     ▼                   ▼
//!                ┌──────────┐       ┌──────────┐
//!                │   CLI    │       │   MCP    │
//!                │  (kex)   │       │ (stdio)  │
//!                └──────────┘       └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | `.kex.yaml` parsing |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`models`] | Document and index types |
//! | [`parser`] | Front-matter parsing and serialization |
//! | [`provider`] | Provider trait and provider stack construction |
//! | [`provider_fs`] | Local directory provider |
//! | [`provider_http`] | Remote `kex.json` provider |
//! | [`provider_composite`] | Ordered merge of providers |
//! | [`indexer`] | Keyword index and lazy body loading |
//! | [`search`] | Search use case |
//! | [`get`] | Retrieve use case |
//! | [`validate`] | Document rules and validation report |
//! | [`traits`] | MCP tool trait and registry |
//! | [`server`] | MCP stdio server |

pub mod config;
pub mod get;
pub mod indexer;
pub mod logging;
pub mod models;
pub mod parser;
pub mod provider;
pub mod provider_composite;
pub mod provider_fs;
pub mod provider_http;
pub mod search;
pub mod server;
pub mod traits;
pub mod validate;
