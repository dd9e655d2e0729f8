//! Tracing subscriber setup
//!
//! Logs go to stderr as text or JSON lines, and optionally to a file as well.
//! `RUST_LOG` takes precedence over the configured level; `--verbose` forces
//! `debug`.

use anyhow::Context;
use std::path::Path;
use tasktree_core::LoggingConfig;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Build the level filter for the given settings
///
/// # Errors
/// Returns an error if the level is not a valid filter directive
pub fn build_filter(level: &str, verbose: bool) -> anyhow::Result<EnvFilter> {
    if verbose {
        return Ok(EnvFilter::new("debug"));
    }
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).with_context(|| format!("Invalid log level: {level}")),
    }
}

fn stderr_layer(json: bool) -> BoxedLayer {
    if json {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    }
}

fn file_layer(path: &Path, json: bool) -> anyhow::Result<(BoxedLayer, WorkerGuard)> {
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .with_context(|| format!("Log file path has no file name: {}", path.display()))?;
    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create log directory {}", directory.display()))?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = if json {
        fmt::layer()
            .json()
            .with_writer(writer)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(FmtSpan::CLOSE)
            .boxed()
    };
    Ok((layer, guard))
}

/// Install the global subscriber
///
/// The returned guard flushes the log file on drop and must be held for the
/// life of the process.
///
/// # Errors
/// Returns an error if the filter is invalid, the log file cannot be set up,
/// or a subscriber is already installed
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = build_filter(&config.level, verbose)?;

    let mut layers: Vec<BoxedLayer> = vec![stderr_layer(config.json)];
    let guard = match &config.file {
        Some(path) => {
            let (layer, guard) = file_layer(path, config.json)?;
            layers.push(layer);
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if let Some(path) = &config.file {
        info!("File logging initialized: {}", path.display());
    }
    Ok(guard)
}
