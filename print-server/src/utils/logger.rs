//! Logging Infrastructure
//!
//! - console output, pretty in development and JSON when asked for
//! - optional daily rolling files (`print-server.YYYY-MM-DD.log`)
//! - retention cleanup for the rolling files

use std::fs;
use std::path::Path;

use chrono::{NaiveDate, Utc};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_PREFIX: &str = "print-server";
const LOG_FILE_SUFFIX: &str = "log";

/// Delete rolling log files older than `retention_days`
///
/// Returns the number of files removed. Files that do not match the rolling
/// name pattern are left alone.
pub fn cleanup_old_logs(log_dir: &Path, retention_days: u64) -> anyhow::Result<usize> {
    if !log_dir.exists() {
        return Ok(0);
    }

    let cutoff = Utc::now().date_naive() - chrono::Duration::days(retention_days as i64);
    let mut removed = 0;

    for entry in fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        let Some(date) = log_file_date(name) else {
            continue;
        };
        if date < cutoff {
            fs::remove_file(&path)?;
            tracing::info!(file = %name, "Deleted old log file");
            removed += 1;
        }
    }

    Ok(removed)
}

/// Date of a rolling log file (`print-server.2024-05-01.log`)
fn log_file_date(name: &str) -> Option<NaiveDate> {
    let date = name
        .strip_prefix(LOG_FILE_PREFIX)?
        .strip_prefix('.')?
        .strip_suffix(LOG_FILE_SUFFIX)?
        .strip_suffix('.')?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Initialize the logging system
///
/// `RUST_LOG` wins over `level` when set.
///
/// # Examples
/// ```no_run
/// // Development (console only)
/// print_server::init_logger_with_file("debug", false, None)?;
///
/// // Production (console + daily files)
/// print_server::init_logger_with_file("info", true, Some(std::path::Path::new("./logs")))?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn init_logger_with_file(
    level: &str,
    json_format: bool,
    log_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = if json_format {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    let file_layer = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(LOG_FILE_PREFIX)
                .filename_suffix(LOG_FILE_SUFFIX)
                .build(dir)?;

            let layer = fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(appender));

            Some(if json_format {
                layer.json().with_current_span(true).boxed()
            } else {
                layer.boxed()
            })
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}
