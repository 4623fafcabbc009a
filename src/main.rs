use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use s3_backup_transfer::cli::Args;
use s3_backup_transfer::cloud::s3::S3Store;
use s3_backup_transfer::config::{load_or_default_config, AppConfig, FileConfig};
use s3_backup_transfer::logging::initialize_logging;
use s3_backup_transfer::notify::smtp::SmtpMailer;
use s3_backup_transfer::pipeline::Pipeline;

fn main() -> Result<()> {
    // Parse arguments
    let args = Args::parse();

    // Load configuration
    let config_path = args.config_path();
    let file_config = load_or_default_config(&config_path, args.config.is_some())
        .context("Failed to load configuration")?;
    let config = AppConfig::from_sources(&args, file_config.as_ref().unwrap_or(&FileConfig::default()));

    // Initialize logging
    initialize_logging(&config.logging)?;
    if file_config.is_none() {
        warn!("Config file {} not found, using defaults", config_path.display());
    }

    info!("Starting transfer of {} to bucket {}", config.job.source_path.display(), config.job.bucket);

    // Archive, upload and notify
    let mut pipeline = Pipeline::new(&config, SmtpMailer::new());
    let outcome = pipeline
        .run(|| S3Store::connect(&config.storage))
        .context("Transfer failed")?;

    info!("Transfer finished: s3://{}/{}", config.job.bucket, outcome.key_name);
    Ok(())
}
