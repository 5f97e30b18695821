//! Configuration and rule list storage.
//!
//! The three persisted rule lists and the path of the `.htaccess` file live in
//! one YAML file. Each list may be written either as a comma-separated string
//! or as a sequence; both are sanitized on load.
//!
//! ```yaml
//! htaccess_path: /var/www/html/.htaccess
//! forwarded_for: "203.0.113.7, 198.51.100.0/24"
//! remote_address:
//!   - 192.0.2.1
//! htaccess_forwarded_for: []
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::BlockerError;
use crate::sanitize::RuleSet;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/simple-ip-blocker/config.yaml";

/// Default `.htaccess` location (web server document root).
pub const DEFAULT_HTACCESS_PATH: &str = "/var/www/html/.htaccess";

/// The independently stored rule lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleList {
    /// Checked against the `X-Forwarded-For` header.
    ForwardedFor,
    /// Checked against the direct remote address.
    RemoteAddress,
    /// Forwarded-for list mirrored into the `.htaccess` rule block.
    HtaccessForwardedFor,
}

impl RuleList {
    pub const ALL: [RuleList; 3] = [
        RuleList::ForwardedFor,
        RuleList::RemoteAddress,
        RuleList::HtaccessForwardedFor,
    ];

    /// Settings key the host stores this list under.
    pub fn option_key(&self) -> &'static str {
        match self {
            RuleList::ForwardedFor => "sib_blocked_xff_ips",
            RuleList::RemoteAddress => "sib_blocked_ra_ips",
            RuleList::HtaccessForwardedFor => "sib_blocked_htaccess_xff_ips",
        }
    }

    pub fn from_option_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|list| list.option_key() == key)
    }

    /// Whether changes to this list must be written to the `.htaccess` file.
    pub fn is_mirrored_to_htaccess(&self) -> bool {
        matches!(self, RuleList::HtaccessForwardedFor)
    }
}

impl fmt::Display for RuleList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.option_key())
    }
}

/// Storage for the rule lists.
///
/// Passed explicitly to [`crate::decision::AccessFilter`] and the
/// [`crate::settings`] functions instead of living in process-wide state.
#[cfg_attr(test, mockall::automock)]
pub trait RuleStore {
    /// Current rules of `list`; an unset list is empty.
    fn rules(&self, list: RuleList) -> RuleSet;

    /// Replace the rules of `list`.
    fn set_rules(&mut self, list: RuleList, rules: RuleSet) -> Result<()>;
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `.htaccess` file that receives the rule block
    pub htaccess_path: PathBuf,

    /// Blocked `X-Forwarded-For` addresses
    #[serde(alias = "sib_blocked_xff_ips")]
    pub forwarded_for: RuleSet,

    /// Blocked remote addresses
    #[serde(alias = "sib_blocked_ra_ips")]
    pub remote_address: RuleSet,

    /// Blocked `X-Forwarded-For` addresses enforced by the web server
    #[serde(alias = "sib_blocked_htaccess_xff_ips")]
    pub htaccess_forwarded_for: RuleSet,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            htaccess_path: PathBuf::from(DEFAULT_HTACCESS_PATH),
            forwarded_for: RuleSet::new(),
            remote_address: RuleSet::new(),
            htaccess_forwarded_for: RuleSet::new(),
        }
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;

        config.validate()?;

        Ok(config)
    }

    /// Load the file if it exists, otherwise start from defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.htaccess_path.as_os_str().is_empty() {
            return Err(BlockerError::Config("htaccess_path cannot be empty".to_string()).into());
        }

        if self.htaccess_path.file_name().is_none() {
            return Err(BlockerError::Config(format!(
                "htaccess_path must name a file: {:?}",
                self.htaccess_path
            ))
            .into());
        }

        Ok(())
    }

    /// Save configuration to YAML file atomically
    ///
    /// Uses tempfile + rename pattern to prevent corruption on crash.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let path = path.as_ref();
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        let parent_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent_dir)
            .with_context(|| format!("Failed to create config directory: {:?}", parent_dir))?;

        let mut temp_file = NamedTempFile::new_in(parent_dir)
            .context("Failed to create temporary file for config")?;

        temp_file.write_all(content.as_bytes())?;
        temp_file.as_file().sync_all()?;

        temp_file
            .persist(path)
            .with_context(|| format!("Failed to persist config file: {:?}", path))?;

        Ok(())
    }

    fn list(&self, list: RuleList) -> &RuleSet {
        match list {
            RuleList::ForwardedFor => &self.forwarded_for,
            RuleList::RemoteAddress => &self.remote_address,
            RuleList::HtaccessForwardedFor => &self.htaccess_forwarded_for,
        }
    }

    fn list_mut(&mut self, list: RuleList) -> &mut RuleSet {
        match list {
            RuleList::ForwardedFor => &mut self.forwarded_for,
            RuleList::RemoteAddress => &mut self.remote_address,
            RuleList::HtaccessForwardedFor => &mut self.htaccess_forwarded_for,
        }
    }
}

impl RuleStore for Config {
    fn rules(&self, list: RuleList) -> RuleSet {
        self.list(list).clone()
    }

    fn set_rules(&mut self, list: RuleList, rules: RuleSet) -> Result<()> {
        *self.list_mut(list) = rules;
        Ok(())
    }
}

/// A [`Config`] that is written back to its file on every change.
#[derive(Debug, Clone)]
pub struct FileRuleStore {
    path: PathBuf,
    config: Config,
}

impl FileRuleStore {
    /// Open the store at `path`; a missing file yields default configuration.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let config = Config::load_or_default(&path)?;
        Ok(Self { path, config })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl RuleStore for FileRuleStore {
    fn rules(&self, list: RuleList) -> RuleSet {
        self.config.rules(list)
    }

    fn set_rules(&mut self, list: RuleList, rules: RuleSet) -> Result<()> {
        let mut updated = self.config.clone();
        updated.set_rules(list, rules)?;
        updated.save(&self.path)?;
        self.config = updated;
        Ok(())
    }
}
