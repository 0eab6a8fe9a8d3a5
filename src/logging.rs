use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{FrontOfficeError, Result};

const LOG_FILE_PREFIX: &str = "front-office.log";

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level. When `FRONT_OFFICE_LOG_DIR` is
/// set and writable, a daily rolling file layer is added; keep the returned
/// guard alive so buffered lines are flushed on exit.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{},front_office={},hyper=warn,reqwest=warn",
            config.level, config.level
        ))
    });

    let (file_layer, guard) = match std::env::var("FRONT_OFFICE_LOG_DIR") {
        Ok(dir) => match file_writer(Path::new(&dir)) {
            Some((writer, guard)) => {
                let layer = tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false) // No color codes in file
                    .with_target(true);
                (Some(layer), Some(guard))
            }
            None => (None, None),
        },
        Err(_) => (None, None),
    };

    // Console layer, plain or JSON
    let (plain_layer, json_layer) = if config.json {
        (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            ),
        )
    } else {
        (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_writer(std::io::stderr),
            ),
            None,
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(plain_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| FrontOfficeError::Internal(format!("logging init failed: {e}")))?;

    Ok(guard)
}

/// Daily rolling writer for `dir`, or `None` if the directory is unusable.
///
/// `tracing_appender::rolling::daily` panics when it cannot create its first
/// file, so writability is checked up front.
fn file_writer(dir: &Path) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!(
            "Warning: Could not create log directory {} ({}), file logging disabled",
            dir.display(),
            e
        );
        return None;
    }

    let probe = dir.join(".front_office_write_test");
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&probe)
    {
        Ok(_) => {
            let _ = std::fs::remove_file(&probe);
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            Some(tracing_appender::non_blocking(appender))
        }
        Err(e) => {
            eprintln!(
                "Warning: Could not write to log directory {} ({}), file logging disabled",
                dir.display(),
                e
            );
            None
        }
    }
}
