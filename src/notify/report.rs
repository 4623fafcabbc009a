//! Subjects and bodies of the mails the binaries send.

use chrono::NaiveDate;

use crate::constants::{
    MULTIPART_THRESHOLD, SUBJECT_DATE_FORMAT, SUBJECT_FAILED_MARKER, SUBJECT_SUCCESS_MARKER,
    TRANSFER_SUBJECT_SUFFIX,
};
use crate::models::{ObjectSummary, TransferOutcome};

/// `[SUCCESS] 2024/01/15 DB Backup notification` or the `[FAILED]` variant.
pub fn transfer_subject(succeeded: bool, date: NaiveDate) -> String {
    let marker = if succeeded { SUBJECT_SUCCESS_MARKER } else { SUBJECT_FAILED_MARKER };
    format!("{} {} {}", marker, date.format(SUBJECT_DATE_FORMAT), TRANSFER_SUBJECT_SUFFIX)
}

/// Body of a transfer notification.
pub fn transfer_body(bucket: &str, outcome: &TransferOutcome) -> String {
    let mut body = format!(
        "Amazon S3 uploading notification.\n\
         Bucket: {}\n\
         SourceFilePath: {}\n\
         KeyName: {}\n\
         FileSize(Bytes): {}\n\n\
         if FileSize(Bytes) >= {}, selects MultiPartUpload.\n",
        bucket,
        outcome.artifact.path.display(),
        outcome.key_name,
        outcome.artifact.size_bytes,
        MULTIPART_THRESHOLD,
    );

    if let Some(kind) = outcome.error {
        body.push_str(&format!(
            "\nError: {}: {}\n",
            kind,
            outcome.error_message.as_deref().unwrap_or("")
        ));
    }
    body
}

/// `Reports daily backup summaries at 2024/01/15`
pub fn summary_subject(date: NaiveDate) -> String {
    format!("Reports daily backup summaries at {}", date.format(SUBJECT_DATE_FORMAT))
}

/// Opening line of a summary report.
pub fn summary_header(bucket: &str) -> String {
    format!("Bucket: {}\n\n", bucket)
}

/// One report line per stored object.
pub fn summary_line(object: &ObjectSummary) -> String {
    format!("Key: {}, Size: {} bytes\n", object.key, object.size_bytes)
}

/// Closing lines of a summary report.
pub const SUMMARY_TRAILER: &str = "\nend\n";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::models::ArchiveArtifact;
    use std::path::PathBuf;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
    }

    #[test]
    fn test_transfer_subjects() {
        assert_eq!(transfer_subject(true, date()), "[SUCCESS] 2024/01/05 DB Backup notification");
        assert_eq!(transfer_subject(false, date()), "[FAILED] 2024/01/05 DB Backup notification");
    }

    #[test]
    fn test_transfer_body_success() {
        let outcome = TransferOutcome::success(
            ArchiveArtifact {
                path: PathBuf::from("/data/x.tar.gz"),
                size_bytes: 10_485_760,
                is_temporary: true,
            },
            "x.tar.gz".to_string(),
        );

        let body = transfer_body("b1", &outcome);

        assert_eq!(
            body,
            "Amazon S3 uploading notification.\n\
             Bucket: b1\n\
             SourceFilePath: /data/x.tar.gz\n\
             KeyName: x.tar.gz\n\
             FileSize(Bytes): 10485760\n\n\
             if FileSize(Bytes) >= 8388608, selects MultiPartUpload.\n"
        );
    }

    #[test]
    fn test_transfer_body_failure_names_error() {
        let outcome = TransferOutcome::failure(
            ArchiveArtifact {
                path: PathBuf::from("/data/x.tar.gz"),
                size_bytes: 42,
                is_temporary: true,
            },
            "x.tar.gz".to_string(),
            ErrorKind::TransferError,
            "PutObject failed: timeout",
        );

        let body = transfer_body("b1", &outcome);

        assert!(body.contains("FileSize(Bytes): 42"));
        assert!(body.ends_with("Error: TransferError: PutObject failed: timeout\n"));
    }

    #[test]
    fn test_summary_pieces() {
        assert_eq!(summary_subject(date()), "Reports daily backup summaries at 2024/01/05");
        assert_eq!(summary_header("b1"), "Bucket: b1\n\n");
        let object = ObjectSummary { key: "db/x.tar.gz".to_string(), size_bytes: 123 };
        assert_eq!(summary_line(&object), "Key: db/x.tar.gz, Size: 123 bytes\n");
    }
}
