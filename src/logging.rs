//! Logging configuration with journald support on Linux.
//!
//! Logs go to systemd's journal when it is available, otherwise to a daily
//! rolling file.

use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Directives used when `PHOTOCAT_LOG` is unset or unparseable: search
/// results and access denials from this crate, warnings from dependencies.
const DEFAULT_FILTER: &str = "warn,photocat=info";

fn env_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize the logging system.
///
/// Log level can be controlled via the `PHOTOCAT_LOG` environment variable,
/// which takes `EnvFilter` directives (`debug`, `photocat::db=debug,warn`, ...).
/// Compiled SQL and its parameters are logged by `photocat::db` at `debug`.
pub fn init(log_dir: Option<PathBuf>) -> Result<()> {
    let env_filter = env_filter(std::env::var("PHOTOCAT_LOG").ok().as_deref());

    #[cfg(target_os = "linux")]
    {
        if let Ok(journald_layer) = tracing_journald::layer() {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(journald_layer.with_syslog_identifier("photocat".to_string()))
                .init();

            tracing::info!("Logging initialized with journald backend");
            return Ok(());
        }
    }

    let log_dir = log_dir.unwrap_or_else(|| {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("photocat")
            .join("logs")
    });

    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "photocat.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The writer stops when the guard drops.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    tracing::info!(log_dir = %log_dir.display(), "Logging initialized with file backend");
    Ok(())
}
