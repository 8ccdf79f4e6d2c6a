//! Atomic dataset writer.
//!
//! The new file is written to a sibling `<name>.tmp`, flushed to disk, then
//! renamed over the destination. Any failure before the rename leaves the
//! previous file exactly as it was. Identical content is detected by hash
//! and not rewritten.

use ndxrace_core::dataset::{Dataset, DatasetError};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("serialize dataset: {0}")]
    Serialize(#[from] DatasetError),

    #[error("create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("write temporary file {path}: {source}")]
    Temp {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("replace {path}: {source}")]
    Rename {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub path: PathBuf,
    pub bytes: usize,
    /// BLAKE3 of the file contents, hex.
    pub hash: String,
    /// False when the destination already held these exact bytes.
    pub changed: bool,
}

/// Sibling path used for the in-progress write.
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("dataset"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Serialize `dataset` and atomically replace `path` with it.
pub fn write_dataset(dataset: &Dataset, path: &Path) -> Result<WriteOutcome, WriteError> {
    let bytes = dataset.to_json_bytes()?;
    let hash = blake3::hash(&bytes);
    let outcome = |changed| WriteOutcome {
        path: path.to_path_buf(),
        bytes: bytes.len(),
        hash: hash.to_hex().to_string(),
        changed,
    };

    if let Ok(existing) = fs::read(path) {
        if blake3::hash(&existing) == hash {
            info!("{} is unchanged ({} bytes)", path.display(), bytes.len());
            return Ok(outcome(false));
        }
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| WriteError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let tmp = temp_path(path);
    debug!("writing {} bytes to {}", bytes.len(), tmp.display());
    if let Err(source) = write_synced(&tmp, &bytes) {
        let _ = fs::remove_file(&tmp);
        return Err(WriteError::Temp { path: tmp, source });
    }

    if let Err(source) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(WriteError::Rename {
            path: path.to_path_buf(),
            source,
        });
    }
    sync_parent(path);

    info!("wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(outcome(true))
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

// Persist the rename itself. Best effort: not every platform can open a
// directory for syncing.
#[cfg(unix)]
fn sync_parent(path: &Path) {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) {}
