//! Allow/deny decision for an incoming request.
//!
//! Two address sources are checked in a fixed order: the proxy supplied
//! `X-Forwarded-For` value against the forwarded-for rules first, then the
//! direct remote address against the remote-address rules. The first match
//! denies the request and the remaining source is never looked at.

use std::fmt;
use std::net::IpAddr;
use tracing::debug;

use crate::config::{RuleList, RuleStore};
use crate::matcher::matches;
use crate::sanitize::RuleSet;

/// HTTP status the host must answer a denied request with.
pub const FORBIDDEN_STATUS: u16 = 403;

/// Body and title of the denial response.
pub const FORBIDDEN_MESSAGE: &str = "Forbidden";

/// Raw client addresses of one request, as the host received them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestAddresses {
    /// Value of the `X-Forwarded-For` header.
    pub forwarded_for: Option<String>,
    /// Address of the connecting peer.
    pub remote_address: Option<String>,
}

impl RequestAddresses {
    pub fn new(forwarded_for: Option<&str>, remote_address: Option<&str>) -> Self {
        Self {
            forwarded_for: forwarded_for.map(String::from),
            remote_address: remote_address.map(String::from),
        }
    }

    pub fn with_forwarded_for(mut self, value: impl Into<String>) -> Self {
        self.forwarded_for = Some(value.into());
        self
    }

    pub fn with_remote_address(mut self, value: impl Into<String>) -> Self {
        self.remote_address = Some(value.into());
        self
    }
}

/// Which request address caused a denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressSource {
    ForwardedFor,
    RemoteAddress,
}

impl fmt::Display for AddressSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressSource::ForwardedFor => f.write_str("X-Forwarded-For"),
            AddressSource::RemoteAddress => f.write_str("remote address"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny,
}

impl Verdict {
    pub fn is_denied(&self) -> bool {
        matches!(self, Verdict::Deny)
    }

    /// Status code to terminate the request with, `None` when it may proceed.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Verdict::Allow => None,
            Verdict::Deny => Some(FORBIDDEN_STATUS),
        }
    }
}

/// Decide whether a request is allowed.
///
/// Missing or syntactically invalid addresses are skipped, so a request with
/// no usable address is always allowed.
///
/// # Examples
/// ```
/// use simple_ip_blocker::decision::{decide, RequestAddresses, Verdict};
/// use simple_ip_blocker::sanitize::sanitize;
///
/// let request = RequestAddresses::new(None, Some("9.9.9.9"));
/// let verdict = decide(&request, &sanitize(""), &sanitize("9.9.9.0/24"));
/// assert_eq!(verdict, Verdict::Deny);
/// ```
pub fn decide(
    request: &RequestAddresses,
    forwarded_rules: &RuleSet,
    remote_rules: &RuleSet,
) -> Verdict {
    match evaluate(request, forwarded_rules, remote_rules) {
        Some(_) => Verdict::Deny,
        None => Verdict::Allow,
    }
}

/// Same evaluation as [`decide`], reporting which source matched.
pub fn evaluate(
    request: &RequestAddresses,
    forwarded_rules: &RuleSet,
    remote_rules: &RuleSet,
) -> Option<AddressSource> {
    if source_matches(request.forwarded_for.as_deref(), forwarded_rules) {
        return Some(AddressSource::ForwardedFor);
    }
    if source_matches(request.remote_address.as_deref(), remote_rules) {
        return Some(AddressSource::RemoteAddress);
    }
    None
}

fn source_matches(raw: Option<&str>, rules: &RuleSet) -> bool {
    match raw.and_then(parse_request_address) {
        Some(ip) => matches(ip, rules),
        None => false,
    }
}

/// A request address is usable only if the whole value is a single IP.
/// Comma-separated proxy chains are not split.
///
/// Surrounding whitespace is trimmed first, so a header value of
/// `" 1.2.3.4"` is checked as `1.2.3.4` rather than skipped. The same
/// trimming is applied to admin-entered rules.
fn parse_request_address(raw: &str) -> Option<IpAddr> {
    raw.trim().parse().ok()
}

/// Request filter bound to a rule store.
///
/// Reads the forwarded-for and remote-address lists from the store on every
/// check, so updates made through the store apply to the next request.
pub struct AccessFilter<S: RuleStore> {
    store: S,
}

impl<S: RuleStore> AccessFilter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn check(&self, request: &RequestAddresses) -> Verdict {
        let forwarded_rules = self.store.rules(RuleList::ForwardedFor);
        let remote_rules = self.store.rules(RuleList::RemoteAddress);

        match evaluate(request, &forwarded_rules, &remote_rules) {
            Some(source) => {
                debug!(
                    source = %source,
                    forwarded_for = ?request.forwarded_for,
                    remote_address = ?request.remote_address,
                    "Request denied"
                );
                Verdict::Deny
            }
            None => Verdict::Allow,
        }
    }
}
