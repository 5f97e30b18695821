//! File-based locking around `.htaccess` updates.
//!
//! Uses flock-style advisory locking on a sibling lock file so that two
//! writers never interleave their read-modify-write of the same target.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::BlockerError;

/// A guard that holds an exclusive lock on a lock file.
/// The lock is automatically released when the guard is dropped.
#[derive(Debug)]
pub struct LockGuard {
    _file: File,
    path: PathBuf,
}

impl LockGuard {
    /// Acquire an exclusive lock, blocking until any other holder releases it.
    ///
    /// Uses OpenOptions with create+read+write to avoid TOCTOU race
    /// between file creation and lock acquisition.
    pub fn acquire(lock_path: &Path) -> Result<Self> {
        let file = open_lock_file(lock_path)?;
        file.lock_exclusive()
            .map_err(|e| BlockerError::Lock(format!("{:?}: {}", lock_path, e)))?;

        Ok(Self {
            _file: file,
            path: lock_path.to_path_buf(),
        })
    }

    /// Acquire an exclusive lock without waiting.
    /// Returns an error if another writer currently holds it.
    pub fn try_acquire(lock_path: &Path) -> Result<Self> {
        let file = open_lock_file(lock_path)?;
        file.try_lock_exclusive().map_err(|_| {
            BlockerError::Lock(format!(
                "{:?} is held by another writer. Retry once it completes.",
                lock_path
            ))
        })?;

        Ok(Self {
            _file: file,
            path: lock_path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// Lock is automatically released when file is closed (on drop)

fn open_lock_file(lock_path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)
        .with_context(|| format!("Failed to open lock file: {:?}", lock_path))
}

/// Lock file used for `target`: the same path with `.lock` appended,
/// e.g. `/var/www/html/.htaccess.lock`.
pub fn lock_path_for(target: &Path) -> PathBuf {
    let mut name = OsString::from(target.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

/// Delete a lock file that is no longer needed. A missing file is fine.
///
/// Returns `true` if a file was removed.
pub fn remove_lock_file(lock_path: &Path) -> Result<bool> {
    match std::fs::remove_file(lock_path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(BlockerError::Lock(format!("Failed to remove {:?}: {}", lock_path, e)).into()),
    }
}
