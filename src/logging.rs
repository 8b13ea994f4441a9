use std::path::PathBuf;

use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_level: String,
    /// None disables logging; the terminal belongs to the TUI
    pub log_dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: crate::app_dirs::AppDirs::log_dir(),
        }
    }
}

/// Installs a daily rolling file subscriber. Safe to call more than once.
pub fn init_tracing(config: &LogConfig) -> Result<(), InitError> {
    let Some(dir) = config.log_dir.as_ref() else {
        return Ok(());
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("memspan")
        .filename_suffix("log")
        .max_log_files(14)
        .build(dir)?;

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true);

    // a global subscriber may already be installed (tests)
    let _ = Registry::default()
        .with(env_filter)
        .with(file_layer)
        .try_init();
    Ok(())
}
