//! `.htaccess` rule block generation.
//!
//! The block is delimited by fixed marker lines and denies every request whose
//! `X-Forwarded-For` header starts with a blocked address:
//!
//! ```text
//!
//!
//! # BEGIN Simple-IP-Blocker Rules
//!
//! <Files *>
//!     SetEnvIF X-FORWARDED-FOR "^203\.0\.113\.7" DenyIP
//!     SetEnvIF X-FORWARDED-FOR "^198\.51\.100\." DenyIP
//!     Order allow,deny
//!     Allow from all
//!     Deny from env=DenyIP
//! </Files>
//!
//! # END Simple-IP-Blocker Rules
//! ```
//!
//! CIDR ranges are written as a prefix match on their first three octets,
//! whatever their prefix length. `10.0.0.0/8` therefore only blocks
//! `10.0.0.*` at the web server, while the in-process matcher blocks the whole
//! `/8`. Everything outside the markers is left byte-for-byte intact.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::BlockerError;
use crate::fs_abstraction::{FileSystem, RealFileSystem};
use crate::lock::{lock_path_for, remove_lock_file, LockGuard};
use crate::rule::Rule;
use crate::sanitize::RuleSet;

pub const BEGIN_MARKER: &str = "\n\n# BEGIN Simple-IP-Blocker Rules\n";
pub const END_MARKER: &str = "# END Simple-IP-Blocker Rules\n";

const BLOCK_HEADER: &str = "\n<Files *>\n";
const BLOCK_FOOTER: &str = "\tOrder allow,deny\n\tAllow from all\n\tDeny from env=DenyIP\n</Files>\n\n";

/// Render the `SetEnvIF` line for one rule.
pub fn render_rule_line(rule: &Rule) -> String {
    let pattern = match rule {
        Rule::Literal(addr) => addr.to_string(),
        Rule::Range(net) => {
            let octets = net.addr().octets();
            format!("{}.{}.{}.", octets[0], octets[1], octets[2])
        }
    };
    format!(
        "\tSetEnvIF X-FORWARDED-FOR \"^{}\" DenyIP\n",
        pattern.replace('.', "\\.")
    )
}

/// Render the complete delimited block, markers included.
pub fn render_block(rules: &RuleSet) -> String {
    let mut block = String::with_capacity(256 + rules.len() * 48);
    block.push_str(BEGIN_MARKER);
    block.push_str(BLOCK_HEADER);
    for rule in rules {
        block.push_str(&render_rule_line(rule));
    }
    block.push_str(BLOCK_FOOTER);
    block.push_str(END_MARKER);
    block
}

/// Byte range of the existing block, from the begin marker through the end
/// marker. A block missing its end marker runs to the end of the content.
fn find_block(content: &str) -> Option<(usize, usize)> {
    let start = content.find(BEGIN_MARKER)?;
    let end = match content[start..].find(END_MARKER) {
        Some(offset) => start + offset + END_MARKER.len(),
        None => content.len(),
    };
    Some((start, end))
}

/// Whether `content` already carries a rule block.
pub fn has_block(content: &str) -> bool {
    find_block(content).is_some()
}

/// Insert or replace the rule block in `existing`.
///
/// An empty rule set leaves the content untouched: no empty block is written
/// and an existing block is not removed.
pub fn apply(existing: &str, rules: &RuleSet) -> String {
    if rules.is_empty() {
        return existing.to_string();
    }

    let block = render_block(rules);
    match find_block(existing) {
        Some((start, end)) => {
            let mut content = String::with_capacity(existing.len() - (end - start) + block.len());
            content.push_str(&existing[..start]);
            content.push_str(&block);
            content.push_str(&existing[end..]);
            content
        }
        None => {
            let mut content = String::with_capacity(existing.len() + block.len());
            content.push_str(existing);
            content.push_str(&block);
            content
        }
    }
}

/// Delete the rule block from `existing`, if there is one.
pub fn remove(existing: &str) -> String {
    match find_block(existing) {
        Some((start, end)) => {
            let mut content = String::with_capacity(existing.len() - (end - start));
            content.push_str(&existing[..start]);
            content.push_str(&existing[end..]);
            content
        }
        None => existing.to_string(),
    }
}

/// An `.htaccess` file on disk.
///
/// Every update is a single read-modify-write. With locking enabled (the
/// default for [`HtaccessFile::new`]) it runs under an exclusive advisory lock
/// on `<path>.lock`.
#[derive(Debug, Clone)]
pub struct HtaccessFile<F: FileSystem = RealFileSystem> {
    path: PathBuf,
    fs: F,
    lock_path: Option<PathBuf>,
}

impl HtaccessFile<RealFileSystem> {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let lock_path = Some(lock_path_for(&path));
        Self {
            path,
            fs: RealFileSystem,
            lock_path,
        }
    }
}

impl<F: FileSystem> HtaccessFile<F> {
    /// Use a custom filesystem. Locking is off until [`Self::with_lock`].
    pub fn with_fs<P: AsRef<Path>>(path: P, fs: F) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            fs,
            lock_path: None,
        }
    }

    /// Serialize updates through an advisory lock on `lock_path`.
    pub fn with_lock<P: AsRef<Path>>(mut self, lock_path: P) -> Self {
        self.lock_path = Some(lock_path.as_ref().to_path_buf());
        self
    }

    /// Disable the advisory lock.
    pub fn without_lock(mut self) -> Self {
        self.lock_path = None;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `rules` into the file's rule block, creating the file if needed.
    ///
    /// Returns `true` if the file content changed.
    pub fn apply_rules(&self, rules: &RuleSet) -> Result<bool> {
        let _lock = self.lock()?;

        self.fs
            .create_if_missing(&self.path)
            .map_err(|e| fs_error("create", &self.path, e))?;
        let existing = self.read()?;
        let updated = apply(&existing, rules);

        if updated == existing {
            debug!(path = ?self.path, "Rule block unchanged");
            return Ok(false);
        }

        self.write(&updated)?;
        info!(path = ?self.path, rules = rules.len(), "Wrote rule block");
        Ok(true)
    }

    /// Remove the rule block. A missing file is left missing.
    ///
    /// Returns `true` if a block was removed.
    pub fn remove_rules(&self) -> Result<bool> {
        let _lock = self.lock()?;

        if !self.fs.exists(&self.path) {
            return Ok(false);
        }

        let existing = self.read()?;
        if !has_block(&existing) {
            return Ok(false);
        }

        self.write(&remove(&existing))?;
        info!(path = ?self.path, "Removed rule block");
        Ok(true)
    }

    /// Delete the advisory lock file, if locking is on and the file exists.
    pub fn remove_lock_file(&self) -> Result<bool> {
        match &self.lock_path {
            Some(lock_path) => remove_lock_file(lock_path),
            None => Ok(false),
        }
    }

    /// Current file content, or `None` if the file does not exist.
    pub fn read_content(&self) -> Result<Option<String>> {
        if !self.fs.exists(&self.path) {
            return Ok(None);
        }
        self.read().map(Some)
    }

    fn lock(&self) -> Result<Option<LockGuard>> {
        self.lock_path
            .as_deref()
            .map(LockGuard::acquire)
            .transpose()
    }

    fn read(&self) -> Result<String> {
        self.fs
            .read_to_string(&self.path)
            .map_err(|e| fs_error("read", &self.path, e))
    }

    fn write(&self, content: &str) -> Result<()> {
        self.fs
            .write(&self.path, content.as_bytes())
            .map_err(|e| fs_error("write", &self.path, e))
    }
}

fn fs_error(action: &str, path: &Path, err: std::io::Error) -> anyhow::Error {
    BlockerError::FileSystem(format!("Failed to {} {:?}: {}", action, path, err)).into()
}
