use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;

use crate::constants::{DEFAULT_CONFIG_FILE, DEFAULT_SUMMARY_LOG_PATH};
use crate::logging::{parse_log_level, LogDestination};

/// Command-line arguments for the transfer binary.
///
/// Compresses a file or directory, uploads it to an S3 bucket and optionally
/// mails the outcome.
#[derive(Parser, Debug)]
#[clap(name = "transfer-s3", about = "Transfer a specified file/dir to amazon S3")]
pub struct Args {
    /// Target bucket name
    #[clap(short, long)]
    pub bucket: String,

    /// Target file/dir path
    #[clap(short, long)]
    pub src_path: PathBuf,

    /// Section name in ~/.aws/credentials to take credentials from
    #[clap(long)]
    pub aws_cred_secname: Option<String>,

    /// AWS region of the bucket
    #[clap(long)]
    pub region: Option<String>,

    /// Key name on S3 (default: file name of the uploaded artifact)
    #[clap(short, long)]
    pub key_name: Option<String>,

    /// Upload the source as is instead of a tar.gz archive
    #[clap(long)]
    pub no_compress: bool,

    /// Log level: 10=DEBUG, 20=INFO, 30=WARNING, 40=ERROR, 50=CRITICAL
    #[clap(short = 'L', long, default_value = "20", value_parser = parse_log_level)]
    pub loglevel: LevelFilter,

    /// Log handler
    #[clap(short = 'H', long, value_enum, default_value = "rotation")]
    pub handler: LogDestination,

    /// Log file path (overrides the config file)
    #[clap(long)]
    pub logpath: Option<PathBuf>,

    /// Path to configuration YAML file
    #[clap(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Send a notification mail
    #[clap(long)]
    pub sendmail: bool,
}

impl Args {
    /// Config file to read, falling back to the default in the working directory.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}

/// Command-line arguments for the daily summary binary.
#[derive(Parser, Debug)]
#[clap(
    name = "backup-summary",
    about = "Mail a summary of the objects stored in an amazon S3 bucket"
)]
pub struct SummaryArgs {
    /// Target bucket name
    #[clap(short, long)]
    pub bucket: String,

    /// Key prefixes to report, comma-separated (default: all objects)
    #[clap(long, default_value = "")]
    pub filter_by_prefix: String,

    /// Section name in ~/.aws/credentials to take credentials from
    #[clap(long)]
    pub aws_cred_secname: Option<String>,

    /// AWS region of the bucket
    #[clap(long)]
    pub region: Option<String>,

    /// Log level: 10=DEBUG, 20=INFO, 30=WARNING, 40=ERROR, 50=CRITICAL
    #[clap(short = 'L', long, default_value = "20", value_parser = parse_log_level)]
    pub loglevel: LevelFilter,

    /// Log handler
    #[clap(short = 'H', long, value_enum, default_value = "rotation")]
    pub handler: LogDestination,

    /// Log file path
    #[clap(long, default_value = DEFAULT_SUMMARY_LOG_PATH)]
    pub logpath: PathBuf,
}

impl SummaryArgs {
    /// Prefixes in the order given; an empty filter yields the single prefix `""`.
    pub fn prefixes(&self) -> Vec<String> {
        self.filter_by_prefix
            .split(',')
            .map(|prefix| prefix.trim().to_string())
            .collect()
    }
}
