//! Local file utilities used around the transfer.
//!
//! ## Components
//!
//! - **Compression**: tar.gz artifact creation and scoped removal of temporary archives
//! - **Rotating file**: size-bounded log file used by the `rotation` log handler
//!
//! ### Creating an Artifact
//!
//! ```no_run
//! use s3_backup_transfer::utils::compress::{build_artifact, TempArtifactGuard};
//! use std::path::Path;
//!
//! # fn example() -> Result<(), s3_backup_transfer::errors::ArchiveError> {
//! let artifact = build_artifact(Path::new("/var/backups/db"), true)?;
//! let _cleanup = TempArtifactGuard::new(&artifact);
//! println!("Created archive: {} ({} bytes)", artifact.path.display(), artifact.size_bytes);
//! # Ok(())
//! # }
//! ```

/// tar.gz artifact creation
pub mod compress;

/// Size-rotating log file writer
pub mod rotating_file;
