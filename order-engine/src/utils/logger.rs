//! Logging Infrastructure
//!
//! Structured logging setup with support for both development and production environments.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Initialize the logger with default settings (stdout, `info`)
pub fn init_logger() -> Option<WorkerGuard> {
    init_logger_with_file(None, false, None)
}

/// Initialize the logger with optional JSON format and file output
///
/// `RUST_LOG` takes precedence over `log_level`. File output is only enabled
/// when `log_dir` exists; the returned guard must be held for the process
/// lifetime so buffered lines get flushed.
pub fn init_logger_with_file(
    log_level: Option<&str>,
    json: bool,
    log_dir: Option<&str>,
) -> Option<WorkerGuard> {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    // Add file output if log_dir is provided
    if let Some(dir) = log_dir {
        let log_path = Path::new(dir);
        if log_path.exists() {
            let file_appender = tracing_appender::rolling::daily(log_path, "order-engine");
            let (writer, guard) = tracing_appender::non_blocking(file_appender);
            let builder = builder.with_writer(writer).with_ansi(false);
            if json {
                builder.json().init();
            } else {
                builder.init();
            }
            return Some(guard);
        }
        eprintln!("LOG_DIR {} does not exist, logging to stdout", dir);
    }

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    None
}
