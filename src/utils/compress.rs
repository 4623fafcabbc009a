use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::constants::ARCHIVE_SUFFIX;
use crate::errors::ArchiveError;
use crate::models::ArchiveArtifact;

/// Path of the archive created for `source_path` (`<source>.tar.gz`).
///
/// Trailing separators are dropped first so `/data/x/` maps to `/data/x.tar.gz`.
pub fn archive_path_for(source_path: &Path) -> PathBuf {
    let mut name = source_path.components().as_path().as_os_str().to_owned();
    name.push(ARCHIVE_SUFFIX);
    PathBuf::from(name)
}

/// Package `source_path` into the artifact that will be uploaded.
///
/// With `compress` set, the file or directory tree is written to a gzip-compressed
/// tar next to the source and the returned artifact is temporary. Without it the
/// source file itself is returned and must never be deleted by the caller.
///
/// # Errors
///
/// * [`ArchiveError::SourceNotFound`] - `source_path` does not exist
/// * [`ArchiveError::Archive`] - anything else; a partially written archive is removed
///
/// # Example
///
/// ```no_run
/// # use std::path::Path;
/// # use s3_backup_transfer::utils::compress::build_artifact;
/// let artifact = build_artifact(Path::new("/data/x"), true)?;
/// assert!(artifact.path.ends_with("x.tar.gz"));
/// # Ok::<(), s3_backup_transfer::errors::ArchiveError>(())
/// ```
pub fn build_artifact(source_path: &Path, compress: bool) -> Result<ArchiveArtifact, ArchiveError> {
    let metadata = fs::metadata(source_path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            ArchiveError::SourceNotFound(source_path.to_path_buf())
        } else {
            ArchiveError::Archive {
                path: source_path.to_path_buf(),
                message: e.to_string(),
            }
        }
    })?;

    if !compress {
        if metadata.is_dir() {
            return Err(ArchiveError::Archive {
                path: source_path.to_path_buf(),
                message: "a directory cannot be uploaded without compression".to_string(),
            });
        }
        debug!("Compression disabled, uploading {} as is", source_path.display());
        return Ok(ArchiveArtifact {
            path: source_path.to_path_buf(),
            size_bytes: metadata.len(),
            is_temporary: false,
        });
    }

    let source = resolve_source(source_path).map_err(|e| ArchiveError::Archive {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })?;
    let archive_path = archive_path_for(&source);
    let start = Instant::now();
    info!("Start to create archive file {}", archive_path.display());

    match write_tar_gz(&source, &archive_path) {
        Ok(size_bytes) => {
            info!("Created archive file {} ({} bytes) in {:?}",
                  archive_path.display(), size_bytes, start.elapsed());
            Ok(ArchiveArtifact {
                path: archive_path,
                size_bytes,
                is_temporary: true,
            })
        }
        Err(e) => {
            remove_partial_archive(&archive_path);
            Err(ArchiveError::Archive {
                path: archive_path,
                message: e.to_string(),
            })
        }
    }
}

/// Absolute form of `source_path` with `.` and `..` resolved.
///
/// A final component that names something (`/data/link`) is kept as written so
/// the archive is named after it; only its parent is canonicalized. Paths ending
/// in `.` or `..` are canonicalized whole.
fn resolve_source(source_path: &Path) -> io::Result<PathBuf> {
    match (source_path.parent(), source_path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() { Path::new(".") } else { parent };
            Ok(fs::canonicalize(parent)?.join(name))
        }
        _ => fs::canonicalize(source_path),
    }
}

/// Write the tree under `source` into a tar.gz at `archive_path`, returning its size.
///
/// Entry names are relative to the source's parent so unpacking recreates the
/// source directory by name. Symlinks are followed; a loop is reported as an error.
/// The archive itself is never packed, even when it lies inside the tree.
fn write_tar_gz(source: &Path, archive_path: &Path) -> io::Result<u64> {
    let source = source.components().as_path();
    let base = source.parent().unwrap_or_else(|| Path::new(""));

    let file = File::create(archive_path)?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(true);

    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry?;
        if entry.path() == archive_path {
            continue;
        }
        let name = entry.path().strip_prefix(base).unwrap_or(entry.path());
        if name.as_os_str().is_empty() {
            continue;
        }

        if entry.file_type().is_dir() {
            builder.append_dir(name, entry.path())?;
        } else {
            builder.append_path_with_name(entry.path(), name)?;
        }
        debug!("Archived {}", name.display());
    }

    let encoder = builder.into_inner()?;
    let mut writer = encoder.finish()?;
    writer.flush()?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;

    Ok(fs::metadata(archive_path)?.len())
}

fn remove_partial_archive(archive_path: &Path) {
    match fs::remove_file(archive_path) {
        Ok(()) => debug!("Removed partial archive {}", archive_path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial archive {}: {}", archive_path.display(), e),
    }
}

/// Removes a temporary artifact when dropped.
///
/// Held for the duration of the upload attempt, so the archive is deleted on
/// success, on error returns and while unwinding. Non-temporary artifacts are
/// left alone.
pub struct TempArtifactGuard<'a> {
    artifact: &'a ArchiveArtifact,
}

impl<'a> TempArtifactGuard<'a> {
    pub fn new(artifact: &'a ArchiveArtifact) -> Self {
        Self { artifact }
    }
}

impl Drop for TempArtifactGuard<'_> {
    fn drop(&mut self) {
        if !self.artifact.is_temporary {
            return;
        }

        let path = &self.artifact.path;
        match fs::remove_file(path) {
            Ok(()) => info!("Removed archive file {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Archive file {} already gone", path.display())
            }
            Err(e) => warn!("Failed to remove archive file {}: {}", path.display(), e),
        }
    }
}
