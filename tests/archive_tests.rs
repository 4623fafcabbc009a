//! Integration tests for artifact creation.
//!
//! These verify that archives unpack to the original tree and that the
//! cleanup guard only ever removes temporary artifacts.

use std::env;
use std::fs::{self, File};
use std::path::Path;

use anyhow::Result;
use flate2::read::GzDecoder;
use tempfile::TempDir;

use s3_backup_transfer::errors::ArchiveError;
use s3_backup_transfer::utils::compress::{build_artifact, TempArtifactGuard};

/// Unpacking the archive recreates the source directory by name
#[test]
fn test_archive_unpacks_to_source_tree() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let source = temp_dir.path().join("nightly");
    fs::create_dir_all(source.join("tables/users"))?;
    fs::write(source.join("schema.sql"), "create table users (id int);")?;
    fs::write(source.join("tables/users/data.csv"), "1\n2\n3\n")?;

    let artifact = build_artifact(&source, true)?;
    assert_eq!(artifact.path, fs::canonicalize(temp_dir.path())?.join("nightly.tar.gz"));
    assert_eq!(artifact.size_bytes, fs::metadata(&artifact.path)?.len());

    let unpack_dir = TempDir::new()?;
    tar::Archive::new(GzDecoder::new(File::open(&artifact.path)?)).unpack(unpack_dir.path())?;

    let restored = unpack_dir.path().join("nightly");
    assert_eq!(fs::read_to_string(restored.join("schema.sql"))?, "create table users (id int);");
    assert_eq!(fs::read_to_string(restored.join("tables/users/data.csv"))?, "1\n2\n3\n");

    Ok(())
}

/// The guard removes the archive but never an uncompressed source
#[test]
fn test_guard_only_removes_temporary_artifacts() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let source = temp_dir.path().join("dump.sql");
    fs::write(&source, "select 1;")?;

    let archive = build_artifact(&source, true)?;
    {
        let _cleanup = TempArtifactGuard::new(&archive);
        assert!(archive.path.exists());
    }
    assert!(!archive.path.exists());

    let passthrough = build_artifact(&source, false)?;
    assert_eq!(passthrough.path, source);
    assert!(!passthrough.is_temporary);
    {
        let _cleanup = TempArtifactGuard::new(&passthrough);
    }
    assert!(source.exists());

    Ok(())
}

/// A missing source leaves nothing behind
#[test]
fn test_missing_source_creates_no_archive() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let source = temp_dir.path().join("missing");

    let err = build_artifact(&source, true).unwrap_err();

    assert!(matches!(err, ArchiveError::SourceNotFound(ref p) if p == &source));
    assert_eq!(fs::read_dir(temp_dir.path())?.count(), 0);

    Ok(())
}

/// Archiving `.` from inside the source lands next to it and never packs itself
#[test]
fn test_archive_of_current_directory_excludes_itself() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let source = temp_dir.path().join("x");
    fs::create_dir_all(source.join("sub"))?;
    fs::write(source.join("a.txt"), "alpha")?;
    fs::write(source.join("sub/b.txt"), "beta")?;

    let previous = env::current_dir()?;
    env::set_current_dir(&source)?;
    let result = build_artifact(Path::new("."), true);
    env::set_current_dir(previous)?;
    let artifact = result?;

    assert_eq!(artifact.path, fs::canonicalize(temp_dir.path())?.join("x.tar.gz"));
    assert!(!source.join("..tar.gz").exists());

    let mut names = Vec::new();
    let mut archive = tar::Archive::new(GzDecoder::new(File::open(&artifact.path)?));
    for entry in archive.entries()? {
        names.push(entry?.path()?.to_string_lossy().trim_end_matches('/').to_string());
    }
    names.sort();
    assert_eq!(names, vec!["x", "x/a.txt", "x/sub", "x/sub/b.txt"]);

    Ok(())
}
