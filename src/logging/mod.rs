//! Logging setup
//!
//! `tracing` events are routed to two places: the in-memory [`LogBuffer`]
//! shown in the Messages panel, and optionally a plain-text log file. Nothing
//! is written to stdout/stderr while the terminal UI is running.

pub mod log_buffer;
pub mod log_layer;

pub use log_buffer::{LogBuffer, LogBufferConfig, LogEntry, LogLevel};
pub use log_layer::LogBufferLayer;

use crate::error::{QuackviewError, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Target used for user-facing controller messages.
pub const MESSAGES_TARGET: &str = "quackview::messages";

/// Install the global subscriber.
///
/// `RUST_LOG` overrides `level` when set. `panel_level` is the lowest level of
/// non-controller events copied into the Messages panel.
pub fn init_logging(
    level: &str,
    panel_level: LogLevel,
    log_file: Option<&Path>,
    buffer: Arc<LogBuffer>,
) -> Result<()> {
    let log_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(LogBufferLayer::new(buffer).with_min_level(panel_level))
        .with(log_filter)
        .try_init()
        .map_err(|e| QuackviewError::Config(format!("Failed to initialize logging: {}", e)))
}
