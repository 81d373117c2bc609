//! Logging Infrastructure
//!
//! Structured logging for development and production:
//! - Console output (pretty in development, JSON in production)
//! - Daily rotating application logs (deleted after the retention window)
//! - Permanent ledger logs for events logged with `target: "ledger"` (never deleted)

use std::fs;
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

/// Log target for balance-affecting events, kept permanently
pub const LEDGER_TARGET: &str = "ledger";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize the logger (console only, `info` unless `RUST_LOG` is set)
pub fn init_logger() -> anyhow::Result<()> {
    init_logger_with_file("info", false, None)
}

/// Initialize the logging system with optional daily rotating files
///
/// # Arguments
/// * `level` - Log level (e.g., "info", "debug", "warn"), overridden by `RUST_LOG`
/// * `json_format` - JSON output (production) instead of pretty output (development)
/// * `log_dir` - Optional directory for file logging (creates `app/` and `ledger/`)
pub fn init_logger_with_file(
    level: &str,
    json_format: bool,
    log_dir: Option<&str>,
) -> anyhow::Result<()> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let mut layers: Vec<BoxedLayer> = Vec::new();

    if json_format {
        layers.push(
            fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(console_filter)
                .boxed(),
        );
    } else {
        layers.push(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(console_filter)
                .boxed(),
        );
    }

    if let Some(dir) = log_dir {
        let log_dir = Path::new(dir);
        let app_log_dir = log_dir.join("app");
        let ledger_log_dir = log_dir.join("ledger");
        fs::create_dir_all(&app_log_dir)?;
        fs::create_dir_all(&ledger_log_dir)?;

        // Application logs (rotated daily, subject to cleanup)
        let app_log = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("app")
            .filename_suffix("log")
            .build(&app_log_dir)?;
        layers.push(
            fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(app_log))
                .with_filter(EnvFilter::new(level))
                .with_filter(tracing_subscriber::filter::filter_fn(|meta| {
                    meta.target() != LEDGER_TARGET
                }))
                .boxed(),
        );

        // Ledger logs (never deleted)
        let ledger_log = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("ledger")
            .filename_suffix("log")
            .build(&ledger_log_dir)?;
        layers.push(
            fmt::layer()
                .json()
                .with_target(true)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(ledger_log))
                .with_filter(tracing_subscriber::filter::filter_fn(|meta| {
                    meta.target() == LEDGER_TARGET
                }))
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))?;

    Ok(())
}

/// Delete application log files older than `retain_days`.
///
/// Only touches `app/app.YYYY-MM-DD.log`; ledger logs are kept forever.
/// Returns the number of deleted files.
pub fn cleanup_old_logs(log_dir: &Path, retain_days: i64) -> anyhow::Result<usize> {
    let cutoff = chrono::Utc::now().date_naive() - chrono::Duration::days(retain_days);

    let app_log_dir = log_dir.join("app");
    if !app_log_dir.exists() {
        return Ok(0);
    }

    let mut deleted = 0;
    for entry in fs::read_dir(app_log_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(date_part) = name
            .strip_prefix("app.")
            .and_then(|d| d.strip_suffix(".log"))
            && let Ok(date) = chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            && date < cutoff
        {
            fs::remove_file(&path)?;
            tracing::info!(file = %name, "Deleted old log file");
            deleted += 1;
        }
    }

    Ok(deleted)
}
