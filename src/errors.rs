//! Error types for every stage of the transfer pipeline.
//!
//! Archive and storage errors are fatal to a run; mail errors never are.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Failure while packaging the source into an artifact.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("{} not found", .0.display())]
    SourceNotFound(PathBuf),

    #[error("failed to create archive {}: {message}", .path.display())]
    Archive { path: PathBuf, message: String },
}

/// Failure while talking to the object store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("credentials could not be resolved: {0}")]
    Auth(String),

    #[error("bucket {0} does not exist")]
    BucketNotFound(String),

    #[error("{operation} failed: {cause}")]
    Transfer { operation: String, cause: String },
}

impl StorageError {
    pub fn transfer(operation: impl Into<String>, cause: impl fmt::Display) -> Self {
        StorageError::Transfer {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }
}

/// Which step of a mail delivery went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailErrorKind {
    RecipientsRefused,
    HeloRejected,
    SenderRefused,
    DataError,
    UnsupportedExtension,
    Other,
}

impl fmt::Display for MailErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MailErrorKind::RecipientsRefused => "RecipientsRefused",
            MailErrorKind::HeloRejected => "HeloRejected",
            MailErrorKind::SenderRefused => "SenderRefused",
            MailErrorKind::DataError => "DataError",
            MailErrorKind::UnsupportedExtension => "UnsupportedExtension",
            MailErrorKind::Other => "MailError",
        };
        write!(f, "{}", name)
    }
}

/// Mail delivery failure. Always logged and swallowed by the pipeline.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct MailError {
    pub kind: MailErrorKind,
    pub message: String,
}

impl MailError {
    pub fn new(kind: MailErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    /// Log line describing the failure, worded per kind.
    pub fn describe(&self) -> String {
        match self.kind {
            MailErrorKind::RecipientsRefused => format!("The mail was not sent to {}", self.message),
            MailErrorKind::HeloRejected => format!("SMTP server did not accept HELO/EHLO: {}", self.message),
            MailErrorKind::SenderRefused => format!("SMTP server refused the from address: {}", self.message),
            MailErrorKind::DataError => format!("SMTP server rejected the message data: {}", self.message),
            MailErrorKind::UnsupportedExtension => format!("SMTP server does not support {}", self.message),
            MailErrorKind::Other => format!("SMTP session failed: {}", self.message),
        }
    }
}

/// Config file could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {} not found", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read config file {}: {source}", .path.display())]
    Read { path: PathBuf, source: std::io::Error },

    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse { path: PathBuf, source: serde_yaml::Error },
}

/// Discriminant of every failure the pipeline can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidJob,
    SourceNotFound,
    ArchiveError,
    AuthError,
    BucketNotFound,
    TransferError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidJob => "InvalidJob",
            ErrorKind::SourceNotFound => "SourceNotFound",
            ErrorKind::ArchiveError => "ArchiveError",
            ErrorKind::AuthError => "AuthError",
            ErrorKind::BucketNotFound => "BucketNotFound",
            ErrorKind::TransferError => "TransferError",
        };
        write!(f, "{}", name)
    }
}

/// Fatal pipeline failure, propagated to the process exit status.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid job: {0}")]
    InvalidJob(String),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidJob(_) => ErrorKind::InvalidJob,
            PipelineError::Archive(ArchiveError::SourceNotFound(_)) => ErrorKind::SourceNotFound,
            PipelineError::Archive(ArchiveError::Archive { .. }) => ErrorKind::ArchiveError,
            PipelineError::Storage(StorageError::Auth(_)) => ErrorKind::AuthError,
            PipelineError::Storage(StorageError::BucketNotFound(_)) => ErrorKind::BucketNotFound,
            PipelineError::Storage(StorageError::Transfer { .. }) => ErrorKind::TransferError,
        }
    }
}
