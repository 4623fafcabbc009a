use std::fmt;
use std::path::{Path, PathBuf};

use crate::constants::MULTIPART_THRESHOLD;
use crate::errors::ErrorKind;

/// One transfer request, built from invocation parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferJob {
    pub bucket: String,
    pub source_path: PathBuf,
    pub key_name: Option<String>,
    pub compress: bool,
}

/// The local file that is actually sent to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveArtifact {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Created by the pipeline and removed after the upload attempt
    pub is_temporary: bool,
}

/// How an artifact is sent to the object store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStrategy {
    SingleRequest,
    Multipart,
}

impl TransferStrategy {
    /// Multipart at or above [`MULTIPART_THRESHOLD`], single request below it.
    pub fn for_size(size_bytes: u64) -> Self {
        if size_bytes >= MULTIPART_THRESHOLD {
            TransferStrategy::Multipart
        } else {
            TransferStrategy::SingleRequest
        }
    }
}

impl fmt::Display for TransferStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferStrategy::SingleRequest => write!(f, "single-request"),
            TransferStrategy::Multipart => write!(f, "multipart"),
        }
    }
}

/// Result of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub bucket: String,
    pub key: String,
    pub strategy: TransferStrategy,
    pub parts: usize,
    pub bytes: u64,
}

/// Recorded result of one job, handed to the notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub succeeded: bool,
    pub error: Option<ErrorKind>,
    pub error_message: Option<String>,
    pub artifact: ArchiveArtifact,
    pub key_name: String,
}

impl TransferOutcome {
    pub fn success(artifact: ArchiveArtifact, key_name: String) -> Self {
        Self {
            succeeded: true,
            error: None,
            error_message: None,
            artifact,
            key_name,
        }
    }

    pub fn failure(
        artifact: ArchiveArtifact,
        key_name: String,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            succeeded: false,
            error: Some(kind),
            error_message: Some(message.into()),
            artifact,
            key_name,
        }
    }

    /// Failure recorded before an artifact existed; the source path stands in for it.
    pub fn aborted(job: &TransferJob, kind: ErrorKind, message: impl Into<String>) -> Self {
        let artifact = ArchiveArtifact {
            path: job.source_path.clone(),
            size_bytes: 0,
            is_temporary: false,
        };
        let key_name = resolve_key(job.key_name.as_deref(), &job.source_path);
        Self::failure(artifact, key_name, kind, message)
    }
}

/// One stored object as reported by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub size_bytes: u64,
}

/// Object key for `path`: the explicit key when given, otherwise the base filename.
pub fn resolve_key(key_name: Option<&str>, path: &Path) -> String {
    match key_name {
        Some(key) if !key.is_empty() => key.to_string(),
        _ => path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string()),
    }
}
