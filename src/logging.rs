//! Logging setup.
//!
//! All log output goes to stderr: stdout carries MCP protocol messages.
//! The filter comes from `KEX_LOG` when set, otherwise from
//! `logging.level`. With `logging.file` configured, logs are also appended
//! to that file.

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::LoggingConfig;

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "KEX_LOG";

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop; hold it for the
/// lifetime of the process.
pub fn init_logging(config: &LoggingConfig, project_root: &Path) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("Invalid log level: {}", config.level))?;

    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    match &config.file {
        Some(file) => {
            let path = if file.is_absolute() {
                file.clone()
            } else {
                project_root.join(file)
            };
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let file_name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "kex.log".into());

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer().with_writer(writer).with_ansi(false);

            Registry::default()
                .with(filter)
                .with(stderr)
                .with(file_layer)
                .try_init()
                .context("Failed to install log subscriber")?;
            Ok(Some(guard))
        }
        None => {
            Registry::default()
                .with(filter)
                .with(stderr)
                .try_init()
                .context("Failed to install log subscriber")?;
            Ok(None)
        }
    }
}
