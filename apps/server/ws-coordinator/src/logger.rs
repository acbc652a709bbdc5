//! Process-wide logger for the coordinator daemon.
//!
//! Every record goes to stdout (level colored, for `journalctl` or a terminal)
//! and to `ws-coordinator.log` in the configured log directory (plain). Both
//! sinks share one line layout:
//!
//! ```text
//! [2026-01-01T12:00:00Z - INFO] WebSocket connection added: id=…, total=100 [src/registry/mod.rs:83]
//! ```

use crate::error::CoordinatorAppError;

use common::ErrorLocation;

use std::fmt::{Arguments, Display};
use std::fs::{File, create_dir_all};
use std::io::stdout;
use std::path::Path;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::Dispatch;
use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use humantime::format_rfc3339;
use log::{LevelFilter, Record, info, warn};

static INIT_LOGGER_ONCE: Once = Once::new();

/// Set by the first `initialize` call, successful or not.
static LOGGER_ALREADY_CALLED: AtomicBool = AtomicBool::new(false);

/// File the coordinator appends to inside `logging.directory`.
pub const LOG_FILE_NAME: &str = "ws-coordinator.log";

/// Debug builds also show close acknowledgements and drain polling.
#[cfg(debug_assertions)]
const LOG_LEVEL: LevelFilter = LevelFilter::Debug;

#[cfg(not(debug_assertions))]
const LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Install the coordinator's global logger.
///
/// Called once from `main` after the config is loaded, since the log
/// directory comes from `logging.directory`. Repeat calls only warn.
///
/// # Errors
///
/// Returns [`CoordinatorAppError::Logger`] when the log directory or file
/// cannot be created, or a global logger is already installed.
pub fn initialize(log_dir: &Path) -> Result<(), CoordinatorAppError> {
    if LOGGER_ALREADY_CALLED.swap(true, Ordering::SeqCst) {
        warn!("Logger already initialized");
        return Ok(());
    }

    let mut result = Ok(());

    INIT_LOGGER_ONCE.call_once(|| {
        result = install(log_dir);
        if result.is_ok() {
            info!(
                "Coordinator logging at {:?} to {}",
                LOG_LEVEL,
                log_dir.join(LOG_FILE_NAME).display()
            );
        }
    });

    result
}

/// Create `log_dir` if needed and open the log file in append mode.
#[track_caller]
pub(crate) fn open_log_file(log_dir: &Path) -> Result<File, CoordinatorAppError> {
    create_dir_all(log_dir).map_err(|e| CoordinatorAppError::Logger {
        message: format!("Failed to create log directory {}: {e}", log_dir.display()),
        location: ErrorLocation::caller(),
    })?;

    fern::log_file(log_dir.join(LOG_FILE_NAME)).map_err(|e| CoordinatorAppError::Logger {
        message: format!("Failed to create log file: {e}"),
        location: ErrorLocation::caller(),
    })
}

/// One log line, without the trailing newline.
pub(crate) fn format_line(
    timestamp: SystemTime,
    level: impl Display,
    message: &Arguments<'_>,
    file: Option<&str>,
    line: Option<u32>,
) -> String {
    format!(
        "[{} - {}] {} [{}:{}]",
        format_rfc3339(timestamp),
        level,
        message,
        file.unwrap_or("unknown"),
        line.unwrap_or(0)
    )
}

fn record_line(record: &Record<'_>, level: impl Display, message: &Arguments<'_>) -> String {
    format_line(
        SystemTime::now(),
        level,
        message,
        record.file(),
        record.line(),
    )
}

#[track_caller]
fn install(log_dir: &Path) -> Result<(), CoordinatorAppError> {
    let log_file = open_log_file(log_dir)?;

    let colors = ColoredLevelConfig::new()
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red)
        .trace(Magenta);

    let terminal = Dispatch::new()
        .format(move |out, message, record| {
            let line = record_line(record, colors.color(record.level()), message);
            out.finish(format_args!("{line}"))
        })
        .chain(stdout());

    let file = Dispatch::new()
        .format(|out, message, record| {
            let line = record_line(record, record.level(), message);
            out.finish(format_args!("{line}"))
        })
        .chain(log_file);

    Dispatch::new()
        .level(LOG_LEVEL)
        .chain(terminal)
        .chain(file)
        .apply()
        .map_err(|e| CoordinatorAppError::Logger {
            message: format!("Failed to install logger: {e}"),
            location: ErrorLocation::caller(),
        })
}
