//! Recording fakes shared by the integration tests.
//!
//! Neither fake touches the network; they record every call so the tests can
//! assert on what the pipeline asked for.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::LevelFilter;

use s3_backup_transfer::cloud::client::StorageSettings;
use s3_backup_transfer::cloud::s3::{ObjectPage, ObjectStore, UploadedPart};
use s3_backup_transfer::config::{AppConfig, MailSettings, NotifyPolicy};
use s3_backup_transfer::errors::{MailError, MailErrorKind, StorageError};
use s3_backup_transfer::logging::{LogDestination, LoggingSettings};
use s3_backup_transfer::models::{ObjectSummary, TransferJob};
use s3_backup_transfer::notify::{MailAuth, MailEnvelope, MailTransport, Recipients};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Put { key: String, bytes: usize, metadata: HashMap<String, String> },
    CreateMultipart { key: String, metadata: HashMap<String, String> },
    UploadPart { part_number: i64, bytes: usize },
    Complete { parts: usize },
    Abort { upload_id: String },
    List { prefix: String, token: Option<String> },
}

/// Object store that keeps calls in memory.
#[derive(Default)]
pub struct RecordingStore {
    pub calls: RefCell<Vec<StoreCall>>,
    /// Fail every PutObject and UploadPart
    pub fail_uploads: bool,
    /// Objects returned by listings, keyed by prefix
    pub objects: HashMap<String, Vec<ObjectSummary>>,
    /// Objects per listing page; 0 means one page
    pub page_size: usize,
    /// Whether this path existed when each upload started
    pub watch_path: Option<PathBuf>,
    pub watched_existed: RefCell<Vec<bool>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { fail_uploads: true, ..Self::default() }
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: StoreCall) {
        self.calls.borrow_mut().push(call);
    }

    fn watch(&self) {
        if let Some(path) = &self.watch_path {
            self.watched_existed.borrow_mut().push(path.exists());
        }
    }
}

impl ObjectStore for RecordingStore {
    fn put_object(&self, _bucket: &str, key: &str, body: Vec<u8>, metadata: &HashMap<String, String>) -> Result<(), StorageError> {
        self.watch();
        self.record(StoreCall::Put { key: key.to_string(), bytes: body.len(), metadata: metadata.clone() });
        if self.fail_uploads {
            return Err(StorageError::transfer("PutObject", "simulated network failure"));
        }
        Ok(())
    }

    fn create_multipart_upload(&self, _bucket: &str, key: &str, metadata: &HashMap<String, String>) -> Result<String, StorageError> {
        self.watch();
        self.record(StoreCall::CreateMultipart { key: key.to_string(), metadata: metadata.clone() });
        Ok("upload-1".to_string())
    }

    fn upload_part(&self, _bucket: &str, _key: &str, _upload_id: &str, part_number: i64, body: Vec<u8>) -> Result<UploadedPart, StorageError> {
        self.record(StoreCall::UploadPart { part_number, bytes: body.len() });
        if self.fail_uploads {
            return Err(StorageError::transfer("UploadPart", "simulated network failure"));
        }
        Ok(UploadedPart { part_number, e_tag: format!("etag-{}", part_number) })
    }

    fn complete_multipart_upload(&self, _bucket: &str, _key: &str, _upload_id: &str, parts: Vec<UploadedPart>) -> Result<(), StorageError> {
        self.record(StoreCall::Complete { parts: parts.len() });
        Ok(())
    }

    fn abort_multipart_upload(&self, _bucket: &str, _key: &str, upload_id: &str) -> Result<(), StorageError> {
        self.record(StoreCall::Abort { upload_id: upload_id.to_string() });
        Ok(())
    }

    fn list_objects_page(&self, _bucket: &str, prefix: &str, continuation_token: Option<String>) -> Result<ObjectPage, StorageError> {
        self.record(StoreCall::List { prefix: prefix.to_string(), token: continuation_token.clone() });

        let all = self.objects.get(prefix).cloned().unwrap_or_default();
        let start: usize = continuation_token.map(|t| t.parse().unwrap_or(0)).unwrap_or(0);
        let end = if self.page_size == 0 { all.len() } else { (start + self.page_size).min(all.len()) };
        let next_token = if end < all.len() { Some(end.to_string()) } else { None };

        Ok(ObjectPage { objects: all[start..end].to_vec(), next_token })
    }
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub endpoint: String,
    pub auth: MailAuth,
    pub envelope: MailEnvelope,
    pub message: String,
}

/// Mail transport that keeps messages in memory and optionally fails.
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: RefCell<Vec<SentMail>>,
    pub failure: Option<MailErrorKind>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(kind: MailErrorKind) -> Self {
        Self { failure: Some(kind), ..Self::default() }
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.borrow().clone()
    }
}

impl MailTransport for RecordingTransport {
    fn deliver(&self, endpoint: &str, auth: &MailAuth, envelope: &MailEnvelope, message: &[u8]) -> Result<(), MailError> {
        self.sent.borrow_mut().push(SentMail {
            endpoint: endpoint.to_string(),
            auth: auth.clone(),
            envelope: envelope.clone(),
            message: String::from_utf8_lossy(message).to_string(),
        });
        match self.failure {
            Some(kind) => Err(MailError::new(kind, envelope.recipients.join(", "))),
            None => Ok(()),
        }
    }
}

pub fn app_config(source: &Path, compress: bool, send_mail: bool) -> AppConfig {
    AppConfig {
        job: TransferJob {
            bucket: "b1".to_string(),
            source_path: source.to_path_buf(),
            key_name: None,
            compress,
        },
        storage: StorageSettings::default(),
        logging: LoggingSettings {
            level: LevelFilter::Info,
            destination: LogDestination::Console,
            log_path: PathBuf::from("/tmp/transfer_s3_test.log"),
            rollover_size: 0,
        },
        mail: MailSettings {
            smtp_server: "smtp.example.com:25".to_string(),
            sender: "backup@example.com".to_string(),
            recipients: Recipients::new(
                vec!["ops@example.com".to_string()],
                vec!["dba@example.com".to_string()],
            ),
            auth: MailAuth::NoAuth,
            notify_policy: NotifyPolicy::OnFlag,
        },
        send_mail,
    }
}

/// Write `size` bytes that gzip cannot shrink.
pub fn write_incompressible(path: &Path, size: usize) {
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    let mut data = Vec::with_capacity(size);
    while data.len() < size {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        data.extend_from_slice(&state.to_le_bytes());
    }
    data.truncate(size);
    fs::write(path, data).unwrap();
}
