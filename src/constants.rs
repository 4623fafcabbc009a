//! Global constants for the s3-backup-transfer application.
//!
//! This module centralizes all hardcoded values to improve maintainability
//! and make configuration changes easier.

// Cloud storage constants
/// Artifacts at or above this size are sent with a multipart upload (8MB)
pub const MULTIPART_THRESHOLD: u64 = 8 * 1024 * 1024;

/// Multipart upload part size (8MB, S3 minimum is 5MB)
pub const S3_UPLOAD_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Metadata field carrying the pre-upload byte count of the local artifact
pub const SOURCE_SIZE_METADATA_KEY: &str = "source_size";

// Archive constants
/// Suffix appended to the source path when compressing
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

// Timeout constants
/// Default connection timeout in seconds
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 30;

// Logging constants
/// Default log file for the transfer binary
pub const DEFAULT_TRANSFER_LOG_PATH: &str = "/var/log/transfer_s3.log";

/// Default log file for the summary binary
pub const DEFAULT_SUMMARY_LOG_PATH: &str = "/var/log/create_dailybackup_summary.log";

/// Default rollover size for rotating logs (100MB)
pub const DEFAULT_LOG_ROLLOVER_SIZE: u64 = 100 * 1024 * 1024;

/// Number of rotated log files kept next to the active one
pub const LOG_BACKUP_COUNT: usize = 10;

// Configuration constants
/// Config file looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "transfer_s3.yaml";

// Mail constants
/// SMTP port used when the endpoint does not name one
pub const DEFAULT_SMTP_PORT: u16 = 25;

/// SMTP endpoint used when the config file does not name one
pub const DEFAULT_SMTP_SERVER: &str = "127.0.0.1";

/// Fixed SMTP endpoint of the daily summary report
pub const SUMMARY_SMTP_SERVER: &str = "127.0.0.1";

/// Fixed To recipients of the daily summary report
pub const SUMMARY_TO_ADDRESSES: &[&str] = &["backup-reports@localhost"];

/// Fixed Cc recipients of the daily summary report
pub const SUMMARY_CC_ADDRESSES: &[&str] = &["backup-reports@localhost"];

/// Subject suffix of transfer notifications
pub const TRANSFER_SUBJECT_SUFFIX: &str = "DB Backup notification";

/// Subject marker of successful transfers
pub const SUBJECT_SUCCESS_MARKER: &str = "[SUCCESS]";

/// Subject marker of failed transfers
pub const SUBJECT_FAILED_MARKER: &str = "[FAILED]";

/// Date format used in mail subjects
pub const SUBJECT_DATE_FORMAT: &str = "%Y/%m/%d";
