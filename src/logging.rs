//! Logging setup for hosts embedding this crate.
//!
//! Tracing-based, with an env-filter and a rolling file appender. The host
//! application calls [`init`] once at startup; library code only emits
//! through the `tracing` macros.

use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system.
///
/// Log level is controlled via the `LUMEN_LOG` environment variable:
/// - `LUMEN_LOG=debug` for verbose output
/// - `LUMEN_LOG=info` for standard output (default)
/// - `LUMEN_LOG=warn` for warnings and errors only
pub fn init(log_dir: Option<PathBuf>) -> Result<()> {
    let env_filter = EnvFilter::try_from_env("LUMEN_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let log_dir = log_dir.unwrap_or_else(|| {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lumen")
            .join("logs")
    });

    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "lumen.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Keep the worker guard alive for the process lifetime; init() runs
    // once at startup.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> = std::sync::OnceLock::new();
    let _ = GUARD.set(_guard);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    tracing::info!("Logging initialized with file backend at {:?}", log_dir);
    Ok(())
}
