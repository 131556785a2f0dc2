use crate::utils::error::{PusherError, Result};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

pub const LOG_FILE_PREFIX: &str = "push";
pub const LOG_FILE_SUFFIX: &str = "log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Hourly rotated copy of the console output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileSettings {
    pub directory: PathBuf,
    /// Rotated files kept on disk, the current one included.
    pub max_files: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoggerSettings {
    pub debug: bool,
    pub format: LogFormat,
    pub file: Option<LogFileSettings>,
}

/// Opens `<directory>/push.<yyyy-MM-dd-HH>.log`, creating the directory if needed.
pub fn file_appender(settings: &LogFileSettings) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::HOURLY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(settings.max_files)
        .build(&settings.directory)
        .map_err(|e| log_dir_error(&settings.directory, e))
}

fn log_dir_error(directory: &Path, e: impl std::fmt::Display) -> PusherError {
    PusherError::InvalidConfigValueError {
        field: "--log-dir".to_string(),
        value: directory.display().to_string(),
        reason: format!("Unable to open log file: {}", e),
    }
}

pub fn init_logger(settings: &LoggerSettings) -> Result<()> {
    let filter = if settings.debug {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("cf_log_pusher=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cf_log_pusher=info"))
    };

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);
    layers.push(match settings.format {
        LogFormat::Compact => console.compact().boxed(),
        // Structured output for log shippers
        LogFormat::Json => console.json().boxed(),
    });

    if let Some(file) = &settings.file {
        let appender = file_appender(file)?;
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(appender)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .init();
    Ok(())
}
