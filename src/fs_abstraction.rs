//! Filesystem abstraction layer for testability
//!
//! The `.htaccess` writer goes through this trait so its read-modify-write
//! sequence can be exercised with mockall mocks as well as on a real disk.

use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

#[cfg(test)]
use mockall::automock;

/// Trait abstracting the filesystem operations the rule block writer needs.
///
/// # Example (testing)
/// ```ignore
/// use simple_ip_blocker::fs_abstraction::MockFileSystem;
///
/// let mut mock_fs = MockFileSystem::new();
/// mock_fs.expect_read_to_string()
///     .returning(|_| Ok("Options -Indexes\n".to_string()));
/// ```
#[cfg_attr(test, automock)]
pub trait FileSystem: Send + Sync {
    /// Read file contents as a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Replace a file's contents, creating it if it doesn't exist.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Check if a path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Create an empty file unless one already exists. Existing content is
    /// never truncated.
    fn create_if_missing(&self, path: &Path) -> io::Result<()>;
}

/// Real filesystem implementation using std::fs.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    /// Writes to a temporary file in the same directory and renames it over
    /// `path`, so a failed write never leaves a truncated target behind.
    /// An existing target's permissions carry over to the new file.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let parent_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut temp_file = NamedTempFile::new_in(parent_dir)?;
        temp_file.write_all(contents)?;
        if let Ok(metadata) = std::fs::metadata(path) {
            temp_file.as_file().set_permissions(metadata.permissions())?;
        }
        temp_file.as_file().sync_all()?;

        temp_file.persist(path).map(|_| ()).map_err(|e| e.error)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_if_missing(&self, path: &Path) -> io::Result<()> {
        std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map(|_| ())
    }
}
