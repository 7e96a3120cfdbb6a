//! Structured logging setup.
//!
//! Uses `RUST_LOG` (default `info`) to drive an `EnvFilter`, with a pretty
//! console layer by default and a `SHILLD_LOG_FORMAT=json` switch for
//! machine-readable output — the same knobs the rest of this pack's crates
//! expose for their own daemons.

use std::env;

use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::paths::Paths;

/// Initializes console-only logging. Used when running with `--foreground`.
///
/// # Errors
/// Returns an error if a global subscriber is already installed.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let format = env::var("SHILLD_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let registry = tracing_subscriber::registry().with(env_filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_target(true).with_level(true))
                .try_init()?;
        }
        _ => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_level(true)
                        .with_thread_ids(true)
                        .with_thread_names(true),
                )
                .try_init()?;
        }
    }

    Ok(())
}

/// Initializes dual console+file logging for daemonized runs.
///
/// Console output respects `RUST_LOG` (default `warn`); file output uses
/// `SHILLD_FILE_LOG` (default `info`) and rotates daily, keeping 7 days.
///
/// # Errors
/// Returns an error if the log directory cannot be created or a global
/// subscriber is already installed.
pub fn init_with_file() -> Result<(), Box<dyn std::error::Error>> {
    const DAYS_TO_KEEP: usize = 7;

    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let file_filter = env::var("SHILLD_FILE_LOG")
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let log_dir = Paths::log_dir()?;

    let file_appender = tracing_appender::rolling::Builder::new()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .max_log_files(DAYS_TO_KEEP)
        .filename_prefix("shilld")
        .filename_suffix("log")
        .build(&log_dir)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let registry = tracing_subscriber::registry();

    registry
        .with(
            fmt::layer()
                .compact()
                .with_target(true)
                .with_level(true)
                .with_writer(std::io::stdout)
                .with_filter(console_filter),
        )
        .with(
            fmt::layer()
                .compact()
                .with_target(true)
                .with_level(true)
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .try_init()?;

    // Leaked intentionally: the guard must outlive the process for the
    // non-blocking writer to flush on exit, and shilld never tears down
    // its own logging layer.
    std::mem::forget(guard);

    Ok(())
}
