//! Process-wide `tracing` setup for the `qrgen` binary
//!
//! Library code only emits events; installing a subscriber is left to the
//! binary (or to a `Dispatch` handed to the generator).

use crate::config::{LogRotation, LoggingOptions};
use crate::error::{Error, Result};
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::OnceLock;
use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, NonBlockingBuilder, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

/// Environment variable that takes precedence over `logging.level`.
pub const LOG_LEVEL_ENV: &str = "QRGEN_LOG_LEVEL";

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

type FilteredRegistry = Layered<EnvFilter, Registry>;
type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Install the global subscriber: level filter, stderr output and, when
/// `options.file` is set, a plain-text file sink.
///
/// Does nothing if a global dispatcher is already in place.
pub fn init(options: &LoggingOptions) -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let filter = env_filter(options)?;
    let file = file_layer::<FilteredRegistry>(options)?;

    Registry::default()
        .with(filter)
        .with(file)
        .with(stderr_layer(options.color))
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {e}")))
}

fn env_filter(options: &LoggingOptions) -> Result<EnvFilter> {
    let directives = std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| options.level.clone());
    EnvFilter::try_new(&directives)
        .map_err(|e| Error::Config(format!("Invalid log level '{directives}': {e}")))
}

fn file_layer<S>(options: &LoggingOptions) -> Result<Option<BoxedLayer<S>>>
where
    S: Subscriber + for<'span> LookupSpan<'span> + Send + Sync + 'static,
{
    let Some(path) = options.file.as_deref() else {
        return Ok(None);
    };

    let (writer, guard) = log_writer(path, options.rotation)?;
    // Dropping the guard would stop the background writer.
    let _ = FILE_GUARD.set(guard);

    Ok(Some(
        fmt::layer()
            .with_timer(UtcTime::rfc_3339())
            .with_ansi(false)
            .with_writer(writer)
            .with_target(true)
            .with_level(true)
            .boxed(),
    ))
}

/// Non-blocking writer for `path`: appended to as-is, or split into
/// `<file name>.<period>` files next to it when `rotation` is set.
fn log_writer(path: &Path, rotation: Option<LogRotation>) -> Result<(NonBlocking, WorkerGuard)> {
    let dir = log_dir(path)?;
    let builder = NonBlockingBuilder::default().lossy(false);

    let Some(rotation) = rotation else {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::Config(format!("Failed to open log file {}: {e}", path.display())))?;
        return Ok(builder.finish(file));
    };

    let prefix = path.file_name().ok_or_else(|| {
        Error::Config(format!(
            "Rotated log file '{}' needs a file name to use as prefix",
            path.display()
        ))
    })?;
    let appender = match rotation {
        LogRotation::Hourly => rolling::hourly(dir, prefix),
        LogRotation::Daily => rolling::daily(dir, prefix),
    };
    Ok(builder.finish(appender))
}

/// Parent directory of the log file, created if missing. Bare file names log
/// into the working directory.
fn log_dir(path: &Path) -> Result<&Path> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| {
        Error::Config(format!("Failed to create log directory {}: {e}", dir.display()))
    })?;
    Ok(dir)
}

// stdout carries the artifact path or JSON result, so logs stay on stderr.
fn stderr_layer<S>(color: bool) -> BoxedLayer<S>
where
    S: Subscriber + for<'span> LookupSpan<'span> + Send + Sync + 'static,
{
    fmt::layer()
        .with_timer(UtcTime::rfc_3339())
        .with_writer(io::stderr)
        .with_ansi(color)
        .with_target(true)
        .with_level(true)
        .boxed()
}
