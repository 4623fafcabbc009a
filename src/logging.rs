//! Logger setup for both binaries.
//!
//! Log records go through the `log` facade; `simplelog` provides the backend
//! for the three destinations selectable on the command line.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode, WriteLogger};

use crate::constants::LOG_BACKUP_COUNT;
use crate::utils::rotating_file::RotatingFile;

/// Where log records are written.
#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum LogDestination {
    /// Append to the log path
    File,
    /// Standard output/error
    Console,
    /// Append to the log path, rolling over at the configured size
    Rotation,
}

/// Resolved logger settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub destination: LogDestination,
    pub log_path: PathBuf,
    pub rollover_size: u64,
}

/// Parse a numeric log level: 10=DEBUG, 20=INFO, 30=WARNING, 40=ERROR, 50=CRITICAL.
///
/// `log` has no level above `Error`, so CRITICAL maps to `Error` as well.
pub fn parse_log_level(value: &str) -> Result<LevelFilter, String> {
    match value.trim() {
        "10" => Ok(LevelFilter::Debug),
        "20" => Ok(LevelFilter::Info),
        "30" => Ok(LevelFilter::Warn),
        "40" | "50" => Ok(LevelFilter::Error),
        other => Err(format!("invalid log level '{}': expected one of 10, 20, 30, 40, 50", other)),
    }
}

/// Install the global logger.
pub fn initialize_logging(settings: &LoggingSettings) -> Result<()> {
    match settings.destination {
        LogDestination::Console => {
            TermLogger::init(
                settings.level,
                Config::default(),
                TerminalMode::Mixed,
                ColorChoice::Auto,
            )
            .context("Failed to initialize logger")?;
        }
        LogDestination::File => {
            ensure_parent_dir(&settings.log_path)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&settings.log_path)
                .context(format!("Failed to open log file {}", settings.log_path.display()))?;
            WriteLogger::init(settings.level, Config::default(), file)
                .context("Failed to initialize logger")?;
        }
        LogDestination::Rotation => {
            ensure_parent_dir(&settings.log_path)?;
            let file = RotatingFile::open(&settings.log_path, settings.rollover_size, LOG_BACKUP_COUNT)
                .context(format!("Failed to open log file {}", settings.log_path.display()))?;
            WriteLogger::init(settings.level, Config::default(), file)
                .context("Failed to initialize logger")?;
        }
    }
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create log directory {}", parent.display()))?;
        }
    }
    Ok(())
}
