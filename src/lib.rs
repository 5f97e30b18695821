//! # simple-ip-blocker - IP/CIDR access filter
//!
//! Decides whether a web request may proceed based on its client address, and
//! mirrors a deny-list into an Apache `.htaccess` rule block.
//!
//! ## Features
//!
//! - **Two address sources** - `X-Forwarded-For` and the direct remote address,
//!   each with its own rule list
//! - **Literal and CIDR rules** - exact IPv4/IPv6 addresses and IPv4 ranges
//! - **Lossy sanitization** - malformed entries in admin input are dropped
//! - **Idempotent `.htaccess` block** - inserted, replaced or removed in place,
//!   everything else in the file is preserved
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     simple-ip-blocker                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Settings adapter                                           │
//! │    └── sanitize_and_persist, form_value, uninstall          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Config / RuleStore (serde_yaml)                            │
//! │    └── forwarded_for, remote_address, htaccess lists        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Sanitizer ── Rule parser (ipnet)                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Decision ── Matcher                                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Htaccess rule block                                        │
//! │    └── FileSystem trait, advisory lock (fs2)                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use simple_ip_blocker::config::{FileRuleStore, RuleList};
//! use simple_ip_blocker::decision::{AccessFilter, RequestAddresses, FORBIDDEN_MESSAGE};
//! use simple_ip_blocker::htaccess::HtaccessFile;
//! use simple_ip_blocker::settings::sanitize_and_persist;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut store = FileRuleStore::open("/etc/simple-ip-blocker/config.yaml")?;
//!     let htaccess = HtaccessFile::new(&store.config().htaccess_path);
//!
//!     // Admin form submission
//!     sanitize_and_persist(&mut store, RuleList::RemoteAddress, "203.0.113.7, 198.51.100.0/24", &htaccess)?;
//!
//!     // Incoming request
//!     let filter = AccessFilter::new(store);
//!     let request = RequestAddresses::new(None, Some("198.51.100.20"));
//!     if let Some(status) = filter.check(&request).status_code() {
//!         println!("{} {}", status, FORBIDDEN_MESSAGE);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`rule`] - Rule model and single-token parsing
//! - [`sanitize`] - Rule list sanitization and the [`RuleSet`] type
//! - [`matcher`] - Address membership test
//! - [`decision`] - Allow/deny verdict for a request
//! - [`htaccess`] - `.htaccess` rule block generation and patching
//! - [`config`] - Configuration file and the [`RuleStore`] trait
//! - [`settings`] - Host-facing settings operations
//! - [`fs_abstraction`] - Filesystem trait for testability
//! - [`lock`] - Advisory locking around file updates
//! - [`error`] - Error types

pub mod config;
pub mod decision;
pub mod error;
pub mod fs_abstraction;
pub mod htaccess;
pub mod lock;
pub mod matcher;
pub mod rule;
pub mod sanitize;
pub mod settings;

pub use config::{Config, RuleList, RuleStore};
pub use decision::{decide, RequestAddresses, Verdict};
pub use rule::Rule;
pub use sanitize::{sanitize, RuleSet};
