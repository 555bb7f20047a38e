//! # kex CLI
//!
//! ## Usage
//!
//! ```bash
//! kex [--config .kex.yaml] [--root <dir>] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kex start` | Validate the corpus, then serve MCP on stdio |
//! | `kex check [--json]` | Print the validation report; exit 1 when invalid |
//! | `kex search <keywords>...` | Search guidelines by keyword |
//! | `kex get <id>` | Print a guideline |
//!
//! ## Examples
//!
//! ```bash
//! # Validate guidelines before committing
//! kex check
//!
//! # Guidelines relevant to the file being edited
//! kex search error handling --file-path src/server.go
//!
//! # Register with an MCP client
//! kex start
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use kex::config::{self, DEFAULT_CONFIG_FILE};
use kex::indexer::Indexer;
use kex::provider::{self, Provider};
use kex::validate::{Validator, START_FAILURE};
use kex::{get, logging, search, server, validate};

/// kex: project guidelines for AI coding agents.
#[derive(Parser)]
#[command(
    name = "kex",
    about = "Serve project guidelines to AI coding agents over MCP",
    version
)]
struct Cli {
    /// Path to the configuration file (YAML).
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Project root. Relative sources resolve against it.
    ///
    /// Defaults to the directory containing the configuration file.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server on stdio.
    ///
    /// Refuses to start when any adopted document fails validation or any
    /// document fails to load.
    Start,

    /// Validate all documents.
    Check {
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Search documents by keyword.
    Search {
        /// Keywords (OR semantics).
        #[arg(required = true)]
        keywords: Vec<String>,

        /// Path of the file being worked on; used to infer scopes.
        #[arg(long)]
        file_path: Option<String>,

        /// Only return documents whose scopes equal the inferred scopes.
        #[arg(long)]
        exact: bool,
    },

    /// Print a document by ID.
    Get {
        /// Document ID.
        id: String,
    },
}

fn project_root(cli: &Cli) -> PathBuf {
    if let Some(root) = &cli.root {
        return root.clone();
    }
    match cli.config.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn config_path(cli: &Cli, root: &Path) -> PathBuf {
    if cli.root.is_some() && cli.config.is_relative() && cli.config == Path::new(DEFAULT_CONFIG_FILE) {
        root.join(&cli.config)
    } else {
        cli.config.clone()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let root = project_root(&cli);
    let cfg = config::load_config(&config_path(&cli, &root))?;
    let _guard = logging::init_logging(&cfg.logging, &root)?;

    let composite = provider::build_provider(&cfg, &root)?;
    info!(providers = ?composite.provider_names(), "loading documents");
    let provider: Arc<dyn Provider> = Arc::new(composite);

    let mut indexer = Indexer::new(provider);
    indexer.load().await?;
    info!(documents = indexer.len(), errors = indexer.errors().len(), "index ready");

    match cli.command {
        Commands::Start => {
            let report = Validator::new().validate(&indexer);
            if !report.passes_start_gate() {
                for message in report.error_messages() {
                    eprintln!("{}", message);
                }
                eprintln!("{}", START_FAILURE);
                std::process::exit(1);
            }
            server::run_stdio(Arc::new(indexer)).await?;
        }
        Commands::Check { json } => {
            validate::run_check(&indexer, json)?;
        }
        Commands::Search {
            keywords,
            file_path,
            exact,
        } => {
            search::run_search(Arc::new(indexer), &keywords, file_path.as_deref(), exact)?;
        }
        Commands::Get { id } => {
            get::run_get(Arc::new(indexer), &id).await?;
        }
    }

    Ok(())
}
