use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Read};
use std::time::Instant;

use log::{debug, info, warn};
use rusoto_core::{ByteStream, RusotoError};
use rusoto_s3::{
    AbortMultipartUploadRequest, CompleteMultipartUploadRequest, CompletedMultipartUpload,
    CompletedPart, CreateMultipartUploadRequest, ListObjectsV2Error, ListObjectsV2Request,
    PutObjectRequest, S3Client, UploadPartRequest, S3,
};
use tokio::runtime::{Builder, Runtime};

use crate::cloud::client::{create_s3_client, StorageSettings};
use crate::constants::S3_UPLOAD_CHUNK_SIZE;
use crate::errors::StorageError;
use crate::models::{resolve_key, ArchiveArtifact, ObjectSummary, TransferStrategy, UploadReceipt};

/// A part accepted by the store during a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedPart {
    pub part_number: i64,
    pub e_tag: String,
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectPage {
    pub objects: Vec<ObjectSummary>,
    /// Set while more pages remain
    pub next_token: Option<String>,
}

/// Blocking object store operations the [`StorageClient`] is built on.
///
/// [`S3Store`] is the production implementation; tests substitute fakes.
#[cfg_attr(test, mockall::automock)]
pub trait ObjectStore {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        metadata: &HashMap<String, String>,
    ) -> Result<(), StorageError>;

    /// Start a multipart upload and return its upload id.
    fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<String, StorageError>;

    fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i64,
        body: Vec<u8>,
    ) -> Result<UploadedPart, StorageError>;

    fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> Result<(), StorageError>;

    fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<(), StorageError>;

    /// Fetch one page of keys starting with `prefix` (empty matches everything).
    fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage, StorageError>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for &T {
    fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>, metadata: &HashMap<String, String>) -> Result<(), StorageError> {
        (**self).put_object(bucket, key, body, metadata)
    }

    fn create_multipart_upload(&self, bucket: &str, key: &str, metadata: &HashMap<String, String>) -> Result<String, StorageError> {
        (**self).create_multipart_upload(bucket, key, metadata)
    }

    fn upload_part(&self, bucket: &str, key: &str, upload_id: &str, part_number: i64, body: Vec<u8>) -> Result<UploadedPart, StorageError> {
        (**self).upload_part(bucket, key, upload_id, part_number, body)
    }

    fn complete_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str, parts: Vec<UploadedPart>) -> Result<(), StorageError> {
        (**self).complete_multipart_upload(bucket, key, upload_id, parts)
    }

    fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<(), StorageError> {
        (**self).abort_multipart_upload(bucket, key, upload_id)
    }

    fn list_objects_page(&self, bucket: &str, prefix: &str, continuation_token: Option<String>) -> Result<ObjectPage, StorageError> {
        (**self).list_objects_page(bucket, prefix, continuation_token)
    }
}

/// Uploads artifacts and lists stored objects.
///
/// Artifacts of [`MULTIPART_THRESHOLD`](crate::constants::MULTIPART_THRESHOLD)
/// bytes or more are sent as a multipart upload in 8MB parts, smaller ones
/// with a single PutObject.
pub struct StorageClient<S: ObjectStore> {
    store: S,
}

impl<S: ObjectStore> StorageClient<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Upload `artifact` to `bucket`.
    ///
    /// The key is `key_name` when given, otherwise the artifact's file name.
    /// `metadata` is attached to the stored object.
    pub fn upload(
        &self,
        artifact: &ArchiveArtifact,
        bucket: &str,
        key_name: Option<&str>,
        metadata: Option<&HashMap<String, String>>,
    ) -> Result<UploadReceipt, StorageError> {
        let key = resolve_key(key_name, &artifact.path);
        let metadata = metadata.cloned().unwrap_or_default();
        let strategy = TransferStrategy::for_size(artifact.size_bytes);

        info!("Uploading {} ({} bytes) to s3://{}/{} with {} upload",
              artifact.path.display(), artifact.size_bytes, bucket, key, strategy);
        let start = Instant::now();

        let parts = match strategy {
            TransferStrategy::SingleRequest => {
                self.upload_single(artifact, bucket, &key, &metadata)?;
                1
            }
            TransferStrategy::Multipart => self.upload_multipart(artifact, bucket, &key, &metadata)?,
        };

        let elapsed = start.elapsed();
        let throughput = if elapsed.as_secs() > 0 {
            artifact.size_bytes / elapsed.as_secs()
        } else {
            artifact.size_bytes
        };
        debug!("Uploaded {} to s3://{}/{} in {:?} ({} KB/s)",
               artifact.path.display(), bucket, key, elapsed, throughput / 1024);

        Ok(UploadReceipt {
            bucket: bucket.to_string(),
            key,
            strategy,
            parts,
            bytes: artifact.size_bytes,
        })
    }

    fn upload_single(
        &self,
        artifact: &ArchiveArtifact,
        bucket: &str,
        key: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<(), StorageError> {
        let contents = fs::read(&artifact.path)
            .map_err(|e| StorageError::transfer(format!("read {}", artifact.path.display()), e))?;
        self.store.put_object(bucket, key, contents, metadata)
    }

    /// Returns the number of parts sent.
    fn upload_multipart(
        &self,
        artifact: &ArchiveArtifact,
        bucket: &str,
        key: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<usize, StorageError> {
        let mut file = File::open(&artifact.path)
            .map_err(|e| StorageError::transfer(format!("open {}", artifact.path.display()), e))?;

        let upload_id = self.store.create_multipart_upload(bucket, key, metadata)?;
        debug!("Started multipart upload with ID: {} for {}", upload_id, artifact.path.display());

        match self.send_parts(&mut file, artifact, bucket, key, &upload_id) {
            Ok(parts) => {
                let count = parts.len();
                self.store.complete_multipart_upload(bucket, key, &upload_id, parts)?;
                debug!("Completed multipart upload for {} in {} parts", artifact.path.display(), count);
                Ok(count)
            }
            Err(e) => {
                if let Err(abort_err) = self.store.abort_multipart_upload(bucket, key, &upload_id) {
                    warn!("Failed to abort multipart upload {}: {}", upload_id, abort_err);
                }
                Err(e)
            }
        }
    }

    fn send_parts(
        &self,
        file: &mut File,
        artifact: &ArchiveArtifact,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<Vec<UploadedPart>, StorageError> {
        let mut parts = Vec::new();
        let mut part_number: i64 = 1;

        loop {
            let chunk = read_chunk(file, S3_UPLOAD_CHUNK_SIZE)
                .map_err(|e| StorageError::transfer(format!("read {}", artifact.path.display()), e))?;
            if chunk.is_empty() {
                break;
            }

            debug!("Uploading part {} ({} bytes) of {}", part_number, chunk.len(), key);
            parts.push(self.store.upload_part(bucket, key, upload_id, part_number, chunk)?);
            part_number += 1;
        }

        Ok(parts)
    }

    /// List every object under `prefix`, following pagination to the end.
    ///
    /// Objects come back in the order the store reports them.
    pub fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectSummary>, StorageError> {
        let mut objects = Vec::new();
        let mut token = None;
        let mut pages = 0;

        loop {
            let page = self.store.list_objects_page(bucket, prefix, token.take())?;
            pages += 1;
            objects.extend(page.objects);
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        debug!("Listed {} objects under s3://{}/{} in {} pages", objects.len(), bucket, prefix, pages);
        Ok(objects)
    }
}

fn read_chunk(file: &mut File, size: usize) -> io::Result<Vec<u8>> {
    let mut chunk = Vec::with_capacity(size);
    file.by_ref().take(size as u64).read_to_end(&mut chunk)?;
    Ok(chunk)
}

/// [`ObjectStore`] backed by rusoto.
///
/// rusoto is async; the store owns a current-thread runtime and blocks on
/// every request.
pub struct S3Store {
    client: S3Client,
    runtime: Runtime,
}

impl S3Store {
    /// Build the client, resolving credentials for a named profile up front.
    pub fn connect(settings: &StorageSettings) -> Result<Self, StorageError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StorageError::transfer("start runtime", e))?;
        let client = create_s3_client(&runtime, settings)?;
        Ok(Self { client, runtime })
    }
}

fn metadata_field(metadata: &HashMap<String, String>) -> Option<HashMap<String, String>> {
    if metadata.is_empty() {
        None
    } else {
        Some(metadata.clone())
    }
}

/// Map a rusoto failure onto the storage error taxonomy.
pub(crate) fn classify_error<E: std::error::Error + 'static>(
    bucket: &str,
    operation: &str,
    err: RusotoError<E>,
) -> StorageError {
    match err {
        RusotoError::Credentials(e) => StorageError::Auth(e.to_string()),
        RusotoError::Unknown(ref response)
            if response.status.as_u16() == 404 && response.body_as_str().contains("NoSuchBucket") =>
        {
            StorageError::BucketNotFound(bucket.to_string())
        }
        RusotoError::Unknown(ref response)
            if response.status.as_u16() == 403
                && (response.body_as_str().contains("InvalidAccessKeyId")
                    || response.body_as_str().contains("SignatureDoesNotMatch")) =>
        {
            StorageError::Auth(format!("{} rejected the credentials", operation))
        }
        other => StorageError::transfer(operation, other),
    }
}

/// Listing reports a missing bucket as a modeled service error.
pub(crate) fn classify_list_error(bucket: &str, err: RusotoError<ListObjectsV2Error>) -> StorageError {
    match err {
        RusotoError::Service(ListObjectsV2Error::NoSuchBucket(_)) => {
            StorageError::BucketNotFound(bucket.to_string())
        }
        other => classify_error(bucket, "ListObjectsV2", other),
    }
}

impl ObjectStore for S3Store {
    fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>, metadata: &HashMap<String, String>) -> Result<(), StorageError> {
        let request = PutObjectRequest {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_length: Some(body.len() as i64),
            body: Some(ByteStream::from(body)),
            metadata: metadata_field(metadata),
            ..Default::default()
        };

        self.runtime
            .block_on(self.client.put_object(request))
            .map(|_| ())
            .map_err(|e| classify_error(bucket, "PutObject", e))
    }

    fn create_multipart_upload(&self, bucket: &str, key: &str, metadata: &HashMap<String, String>) -> Result<String, StorageError> {
        let request = CreateMultipartUploadRequest {
            bucket: bucket.to_string(),
            key: key.to_string(),
            metadata: metadata_field(metadata),
            ..Default::default()
        };

        let output = self.runtime
            .block_on(self.client.create_multipart_upload(request))
            .map_err(|e| classify_error(bucket, "CreateMultipartUpload", e))?;
        output.upload_id
            .ok_or_else(|| StorageError::transfer("CreateMultipartUpload", "no upload ID returned from S3"))
    }

    fn upload_part(&self, bucket: &str, key: &str, upload_id: &str, part_number: i64, body: Vec<u8>) -> Result<UploadedPart, StorageError> {
        let request = UploadPartRequest {
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id: upload_id.to_string(),
            part_number,
            content_length: Some(body.len() as i64),
            body: Some(ByteStream::from(body)),
            ..Default::default()
        };

        let output = self.runtime
            .block_on(self.client.upload_part(request))
            .map_err(|e| classify_error(bucket, "UploadPart", e))?;
        let e_tag = output.e_tag
            .ok_or_else(|| StorageError::transfer("UploadPart", "no ETag in upload part response"))?;
        Ok(UploadedPart { part_number, e_tag })
    }

    fn complete_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str, parts: Vec<UploadedPart>) -> Result<(), StorageError> {
        let completed_parts = parts
            .into_iter()
            .map(|part| CompletedPart {
                e_tag: Some(part.e_tag),
                part_number: Some(part.part_number),
            })
            .collect();
        let request = CompleteMultipartUploadRequest {
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id: upload_id.to_string(),
            multipart_upload: Some(CompletedMultipartUpload {
                parts: Some(completed_parts),
            }),
            ..Default::default()
        };

        self.runtime
            .block_on(self.client.complete_multipart_upload(request))
            .map(|_| ())
            .map_err(|e| classify_error(bucket, "CompleteMultipartUpload", e))
    }

    fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<(), StorageError> {
        let request = AbortMultipartUploadRequest {
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id: upload_id.to_string(),
            ..Default::default()
        };

        self.runtime
            .block_on(self.client.abort_multipart_upload(request))
            .map(|_| ())
            .map_err(|e| classify_error(bucket, "AbortMultipartUpload", e))
    }

    fn list_objects_page(&self, bucket: &str, prefix: &str, continuation_token: Option<String>) -> Result<ObjectPage, StorageError> {
        let request = ListObjectsV2Request {
            bucket: bucket.to_string(),
            prefix: if prefix.is_empty() { None } else { Some(prefix.to_string()) },
            continuation_token,
            ..Default::default()
        };

        let output = self.runtime
            .block_on(self.client.list_objects_v2(request))
            .map_err(|e| classify_list_error(bucket, e))?;

        let objects = output.contents
            .unwrap_or_default()
            .into_iter()
            .filter_map(|object| {
                Some(ObjectSummary {
                    key: object.key?,
                    size_bytes: object.size.unwrap_or(0).max(0) as u64,
                })
            })
            .collect();
        let next_token = if output.is_truncated.unwrap_or(false) {
            output.next_continuation_token
        } else {
            None
        };

        Ok(ObjectPage { objects, next_token })
    }
}
