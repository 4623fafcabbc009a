//! # s3-backup-transfer
//!
//! Ships backup artifacts to Amazon S3 and mails the outcome.
//!
//! ## Overview
//!
//! Two binaries are built from this crate:
//!
//! - `transfer-s3` packs a file or directory into a tar.gz archive, uploads it
//!   to a bucket (multipart from 8MB on), removes the temporary archive and
//!   optionally mails a success or failure notice.
//! - `backup-summary` lists a bucket under one or more key prefixes and mails
//!   the resulting report to a fixed set of recipients.
//!
//! ## Usage
//!
//! ```no_run
//! use s3_backup_transfer::cli::Args;
//! use s3_backup_transfer::cloud::s3::S3Store;
//! use s3_backup_transfer::config::{AppConfig, FileConfig};
//! use s3_backup_transfer::notify::smtp::SmtpMailer;
//! use s3_backup_transfer::pipeline::Pipeline;
//! use clap::Parser;
//!
//! # fn main() -> anyhow::Result<()> {
//! let args = Args::parse_from(["transfer-s3", "-b", "backup-bucket", "-s", "/var/backups/db"]);
//! let config = AppConfig::from_sources(&args, &FileConfig::default());
//!
//! let mut pipeline = Pipeline::new(&config, SmtpMailer::new());
//! let outcome = pipeline.run(|| S3Store::connect(&config.storage))?;
//! println!("Uploaded {}", outcome.key_name);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`cli`]: Command-line interface definitions for both binaries
//! - [`config`]: Config file format and the merged runtime configuration
//! - [`pipeline`]: Transfer state machine and the summary run
//! - [`cloud`]: S3 uploads and listings
//! - [`notify`]: Mail composition and SMTP delivery
//! - [`utils`]: Archive creation and the rotating log file
//! - [`logging`]: Logger setup
//! - [`models`], [`errors`], [`constants`]: Shared types and values

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Core data models and structures used throughout the application
pub mod models;

/// Error types of every pipeline stage
pub mod errors;

/// Utility functions for archiving and log files
pub mod utils;

/// Cloud storage integration (S3)
pub mod cloud;

/// Configuration file and runtime configuration
pub mod config;

/// Outcome and summary mails
pub mod notify;

/// Transfer orchestration
pub mod pipeline;

/// Logger initialisation
pub mod logging;

/// Application constants and configuration values
pub mod constants;
