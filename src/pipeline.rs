//! Orchestration of a transfer run and of the daily summary report.
//!
//! A transfer moves through
//! `Init -> Archiving -> Uploading -> Cleanup -> Notifying -> Done`; a failure
//! before or during the upload ends in `AbortedFailure` and is returned to the
//! caller after the failure notice went out. A temporary archive is removed
//! once the upload was attempted, whatever its result. Mail problems are
//! logged and never change the result of a run.

use std::collections::HashMap;
use std::fmt;

use chrono::{Local, NaiveDate};
use log::{debug, error, info};

use crate::cloud::listing::ObjectLister;
use crate::cloud::s3::{ObjectStore, StorageClient};
use crate::config::{AppConfig, MailSettings};
use crate::constants::SOURCE_SIZE_METADATA_KEY;
use crate::errors::{PipelineError, StorageError};
use crate::models::{resolve_key, ArchiveArtifact, TransferJob, TransferOutcome};
use crate::notify::report::{summary_subject, transfer_body, transfer_subject};
use crate::notify::{MailTransport, Notifier};
use crate::utils::compress::{build_artifact, TempArtifactGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    Archiving,
    Uploading,
    Cleanup,
    Notifying,
    Done,
    AbortedFailure,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Init => "Init",
            PipelineState::Archiving => "Archiving",
            PipelineState::Uploading => "Uploading",
            PipelineState::Cleanup => "Cleanup",
            PipelineState::Notifying => "Notifying",
            PipelineState::Done => "Done",
            PipelineState::AbortedFailure => "AbortedFailure",
        };
        write!(f, "{}", name)
    }
}

/// Runs one transfer job described by an [`AppConfig`].
pub struct Pipeline<'a, T: MailTransport> {
    config: &'a AppConfig,
    notifier: Notifier<T>,
    state: PipelineState,
    history: Vec<PipelineState>,
}

impl<'a, T: MailTransport> Pipeline<'a, T> {
    pub fn new(config: &'a AppConfig, transport: T) -> Self {
        Self {
            config,
            notifier: Notifier::new(transport),
            state: PipelineState::Init,
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Every state entered so far, in order.
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    /// Archive, upload and report the configured job.
    ///
    /// `connect` builds the object store once the job is validated; its
    /// failure aborts the run like any other storage error.
    pub fn run<S, F>(&mut self, connect: F) -> Result<TransferOutcome, PipelineError>
    where
        S: ObjectStore,
        F: FnOnce() -> Result<S, StorageError>,
    {
        let config = self.config;
        let job = &config.job;
        self.transition(PipelineState::Init);

        if let Err(e) = validate_job(job) {
            return Err(self.abort_without_artifact(job, e));
        }
        let client = match connect() {
            Ok(store) => StorageClient::new(store),
            Err(e) => return Err(self.abort_without_artifact(job, e.into())),
        };

        self.transition(PipelineState::Archiving);
        let artifact = match build_artifact(&job.source_path, job.compress) {
            Ok(artifact) => artifact,
            Err(e) => return Err(self.abort_without_artifact(job, e.into())),
        };
        info!("Prepared {} ({} bytes, temporary: {})",
              artifact.path.display(), artifact.size_bytes, artifact.is_temporary);

        self.transition(PipelineState::Uploading);
        let key = resolve_key(job.key_name.as_deref(), &artifact.path);
        let cleanup = TempArtifactGuard::new(&artifact);
        let upload_result = client.upload(&artifact, &job.bucket, Some(key.as_str()), Some(&source_metadata(&artifact)));
        drop(cleanup);
        self.transition(PipelineState::Cleanup);

        match upload_result {
            Ok(receipt) => {
                info!("Uploaded s3://{}/{} ({} bytes, {} upload, {} parts)",
                      receipt.bucket, receipt.key, receipt.bytes, receipt.strategy, receipt.parts);
                let outcome = TransferOutcome::success(artifact, key);

                self.transition(PipelineState::Notifying);
                self.send_notice(&outcome);

                self.transition(PipelineState::Done);
                Ok(outcome)
            }
            Err(e) => {
                let err = PipelineError::from(e);
                let outcome = TransferOutcome::failure(artifact, key, err.kind(), err.to_string());
                Err(self.abort(&outcome, err))
            }
        }
    }

    fn transition(&mut self, next: PipelineState) {
        debug!("Pipeline state: {} -> {}", self.state, next);
        self.state = next;
        self.history.push(next);
    }

    fn abort_without_artifact(&mut self, job: &TransferJob, err: PipelineError) -> PipelineError {
        let outcome = TransferOutcome::aborted(job, err.kind(), err.to_string());
        self.abort(&outcome, err)
    }

    fn abort(&mut self, outcome: &TransferOutcome, err: PipelineError) -> PipelineError {
        error!("Transfer of {} failed: {}", self.config.job.source_path.display(), err);
        self.transition(PipelineState::AbortedFailure);
        self.send_notice(outcome);
        err
    }

    fn send_notice(&self, outcome: &TransferOutcome) {
        if !self.config.should_notify() {
            debug!("Notification disabled, not sending mail");
            return;
        }

        let subject = transfer_subject(outcome.succeeded, Local::now().date_naive());
        let body = transfer_body(&self.config.job.bucket, outcome);
        deliver_or_log(&self.notifier, &self.config.mail, &subject, &body);
    }
}

fn validate_job(job: &TransferJob) -> Result<(), PipelineError> {
    if job.bucket.trim().is_empty() {
        return Err(PipelineError::InvalidJob("bucket name is required".to_string()));
    }
    if job.source_path.as_os_str().is_empty() {
        return Err(PipelineError::InvalidJob("source path is required".to_string()));
    }
    Ok(())
}

fn source_metadata(artifact: &ArchiveArtifact) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    metadata.insert(SOURCE_SIZE_METADATA_KEY.to_string(), artifact.size_bytes.to_string());
    metadata
}

/// Send a mail, logging instead of returning any failure.
fn deliver_or_log<T: MailTransport>(notifier: &Notifier<T>, mail: &MailSettings, subject: &str, body: &str) {
    match notifier.notify(&mail.recipients, subject, body, &mail.sender, &mail.smtp_server, &mail.auth) {
        Ok(()) => info!("Sent mail '{}' via {}", subject, mail.smtp_server),
        Err(e) => error!("{}", e.describe()),
    }
}

/// Build the summary report of `bucket` and mail it with `mail`.
///
/// Listing failures are returned; mail failures are logged only. Returns the
/// report that was built.
pub fn run_summary<S: ObjectStore, T: MailTransport>(
    client: &StorageClient<S>,
    notifier: &Notifier<T>,
    mail: &MailSettings,
    bucket: &str,
    prefixes: &[String],
    date: NaiveDate,
) -> Result<String, StorageError> {
    let report = ObjectLister::new(client).summarize(bucket, prefixes).map_err(|e| {
        error!("Failed to list objects in bucket {}: {}", bucket, e);
        e
    })?;

    if mail.notify_policy.allows(true) {
        deliver_or_log(notifier, mail, &summary_subject(date), &report);
    }
    Ok(report)
}
