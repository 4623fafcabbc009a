//! Object storage access.
//!
//! ## Components
//!
//! - **Client**: region and credential resolution for the rusoto S3 client
//! - **S3**: the [`ObjectStore`](s3::ObjectStore) seam, its rusoto backend and
//!   the [`StorageClient`](s3::StorageClient) that picks single-request or
//!   multipart uploads by artifact size
//! - **Listing**: the summary report of a bucket's contents
//!
//! ## Usage Example
//!
//! ```no_run
//! use s3_backup_transfer::cloud::client::StorageSettings;
//! use s3_backup_transfer::cloud::s3::{S3Store, StorageClient};
//! use s3_backup_transfer::utils::compress::build_artifact;
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let settings = StorageSettings { region: Some("us-east-1".to_string()), profile: None };
//! let client = StorageClient::new(S3Store::connect(&settings)?);
//!
//! let artifact = build_artifact(Path::new("/var/backups/db"), true)?;
//! let receipt = client.upload(&artifact, "backup-bucket", None, None)?;
//! println!("Uploaded {} in {} parts", receipt.key, receipt.parts);
//! # Ok(())
//! # }
//! ```

/// Region and credential resolution for the S3 client
pub mod client;

/// Object store seam, rusoto backend and upload strategy
pub mod s3;

/// Bucket summary reports
pub mod listing;
