//! Observability: request context and structured logging.
//!
//! The library emits `tracing` spans and events plus `metrics` counters. It
//! never installs a metrics recorder; [`init_logging`] is offered for hosts
//! that want the default subscriber.

mod logging;
mod request_context;

pub use logging::{LogFormat, LoggingConfig};
pub use request_context::RequestContext;

use crate::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};

static LOGGING_INIT: OnceLock<()> = OnceLock::new();

type FmtLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Installs the global `tracing` subscriber.
///
/// Events go to `config.file` when set, otherwise to stderr.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if logging has already been initialized
/// or the log file cannot be opened.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    if LOGGING_INIT.get().is_some() {
        return Err(logging_init_failed("logging already initialized"));
    }

    let LoggingConfig {
        format,
        filter,
        file,
        ..
    } = config;
    let (writer, ansi) = match file.as_deref() {
        Some(path) => (BoxMakeWriter::new(Arc::new(open_log_file(path)?)), false),
        None => (BoxMakeWriter::new(io::stderr), true),
    };

    tracing_subscriber::registry()
        .with(fmt_layer(format, writer, ansi))
        .with(filter)
        .try_init()
        .map_err(logging_init_failed)?;

    LOGGING_INIT
        .set(())
        .map_err(|()| logging_init_failed("logging already initialized"))
}

fn fmt_layer(format: LogFormat, writer: BoxMakeWriter, ansi: bool) -> FmtLayer {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true);
    match format {
        LogFormat::Json => Box::new(layer.json().with_current_span(true).with_span_list(true)),
        LogFormat::Pretty => Box::new(layer.pretty()),
    }
}

/// Opens `path` for appending, creating missing parent directories.
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
            operation: "create_log_dir".to_string(),
            cause: format!("{}: {e}", parent.display()),
        })?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::OperationFailed {
            operation: "open_log_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })
}

fn logging_init_failed(cause: impl ToString) -> Error {
    Error::OperationFailed {
        operation: "logging_init".to_string(),
        cause: cause.to_string(),
    }
}
