//! Logging setup for the QuantDesk trading platform
//!
//! Builds the tracing subscriber used by every service binary: an
//! env-filterable console layer (plain or JSON) plus an optional
//! daily-rolling JSON file appender. File output is non-blocking; the
//! returned guard must be held for the process lifetime or buffered log
//! lines are lost on shutdown.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Error types for logging setup
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize subscriber: {0}")]
    Init(String),
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is not set
    pub level: String,

    /// Emit JSON to the console instead of human-readable lines
    pub json: bool,

    /// Directory for the rolling file appender; unset disables file output
    pub directory: Option<PathBuf>,

    /// File name prefix for rolled log files
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            directory: None,
            file_prefix: "quantdesk.log".to_string(),
        }
    }
}

/// Microsecond-resolution timestamp formatter
struct MicrosecondTimestamp;

impl FormatTime for MicrosecondTimestamp {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        let now = chrono::Utc::now();
        write!(
            w,
            "{}.{:06}",
            now.format("%Y-%m-%d %H:%M:%S"),
            now.timestamp_subsec_micros()
        )
    }
}

/// Initialize the global subscriber from the given configuration
///
/// Returns the file appender guard when file output is enabled.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            let appender = rolling::daily(dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_timer(MicrosecondTimestamp)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);

    if config.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_timer(MicrosecondTimestamp),
            )
            .try_init()
            .map_err(|e| LoggingError::Init(e.to_string()))?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_timer(MicrosecondTimestamp))
            .try_init()
            .map_err(|e| LoggingError::Init(e.to_string()))?;
    }

    info!(
        level = %config.level,
        json = config.json,
        file_output = config.directory.is_some(),
        "logging initialized"
    );
    Ok(guard)
}

/// Module version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
