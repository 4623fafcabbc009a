//! Mails a daily summary of the objects stored in a bucket.
//!
//! The mail always goes to the fixed summary recipients; no config file is
//! read.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use log::info;

use s3_backup_transfer::cli::SummaryArgs;
use s3_backup_transfer::cloud::client::StorageSettings;
use s3_backup_transfer::cloud::s3::{S3Store, StorageClient};
use s3_backup_transfer::config::MailSettings;
use s3_backup_transfer::constants::DEFAULT_LOG_ROLLOVER_SIZE;
use s3_backup_transfer::logging::{initialize_logging, LoggingSettings};
use s3_backup_transfer::notify::smtp::SmtpMailer;
use s3_backup_transfer::notify::Notifier;
use s3_backup_transfer::pipeline::run_summary;

fn main() -> Result<()> {
    let args = SummaryArgs::parse();

    initialize_logging(&LoggingSettings {
        level: args.loglevel,
        destination: args.handler,
        log_path: args.logpath.clone(),
        rollover_size: DEFAULT_LOG_ROLLOVER_SIZE,
    })?;

    let prefixes = args.prefixes();
    info!("Summarizing bucket {} for prefixes {:?}", args.bucket, prefixes);

    let settings = StorageSettings {
        region: args.region.clone(),
        profile: args.aws_cred_secname.clone(),
    };
    let client = StorageClient::new(
        S3Store::connect(&settings).context("Failed to create S3 client")?,
    );
    let notifier = Notifier::new(SmtpMailer::new());

    run_summary(
        &client,
        &notifier,
        &MailSettings::summary_profile(),
        &args.bucket,
        &prefixes,
        Local::now().date_naive(),
    )
    .context("Failed to build summary report")?;

    Ok(())
}
