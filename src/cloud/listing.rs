use log::{debug, info};

use crate::cloud::s3::{ObjectStore, StorageClient};
use crate::errors::StorageError;
use crate::notify::report::{summary_header, summary_line, SUMMARY_TRAILER};

/// Builds the daily summary report of what a bucket holds.
pub struct ObjectLister<'a, S: ObjectStore> {
    client: &'a StorageClient<S>,
}

impl<'a, S: ObjectStore> ObjectLister<'a, S> {
    pub fn new(client: &'a StorageClient<S>) -> Self {
        Self { client }
    }

    /// One line per object for each prefix in turn, framed by the report
    /// header and trailer. An empty prefix lists the whole bucket; a prefix
    /// matching nothing contributes no lines.
    pub fn summarize(&self, bucket: &str, prefixes: &[String]) -> Result<String, StorageError> {
        let mut report = summary_header(bucket);
        let mut total = 0;

        for prefix in prefixes {
            let objects = self.client.list(bucket, prefix)?;
            debug!("Prefix '{}' matched {} objects", prefix, objects.len());
            total += objects.len();
            for object in &objects {
                report.push_str(&summary_line(object));
            }
        }

        report.push_str(SUMMARY_TRAILER);
        info!("Summarized {} objects in bucket {}", total, bucket);
        Ok(report)
    }
}
