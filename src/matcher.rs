//! Address membership test against a [`RuleSet`].

use ipnet::Ipv4Net;
use std::net::{IpAddr, Ipv4Addr};

use crate::rule::Rule;
use crate::sanitize::RuleSet;

/// Check whether `candidate` is covered by any rule in `rules`.
///
/// Stops at the first matching rule. An empty set never matches.
///
/// # Examples
/// ```
/// use simple_ip_blocker::matcher::matches;
/// use simple_ip_blocker::sanitize::sanitize;
///
/// let rules = sanitize("10.0.0.0/24");
/// assert!(matches("10.0.0.5".parse().unwrap(), &rules));
/// assert!(!matches("10.0.1.5".parse().unwrap(), &rules));
/// ```
pub fn matches(candidate: IpAddr, rules: &RuleSet) -> bool {
    rules.iter().any(|rule| rule_matches(candidate, rule))
}

/// Like [`matches`], but takes the raw candidate text. Input that is not a
/// valid address never matches.
pub fn matches_str(candidate: &str, rules: &RuleSet) -> bool {
    match candidate.trim().parse::<IpAddr>() {
        Ok(ip) => matches(ip, rules),
        Err(_) => false,
    }
}

/// Check a single rule.
pub fn rule_matches(candidate: IpAddr, rule: &Rule) -> bool {
    match (rule, candidate) {
        (Rule::Literal(addr), _) => *addr == candidate,
        (Rule::Range(net), IpAddr::V4(v4)) => range_contains(net, v4),
        // Ranges are IPv4 only
        (Rule::Range(_), IpAddr::V6(_)) => false,
    }
}

/// Mask both sides with the prefix. The stored network keeps whatever host
/// bits it was written with, so `10.0.0.7/24` covers `10.0.0.0 - 10.0.0.255`.
fn range_contains(net: &Ipv4Net, candidate: Ipv4Addr) -> bool {
    let mask = prefix_mask(net.prefix_len());
    u32::from(candidate) & mask == u32::from(net.addr()) & mask
}

fn prefix_mask(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix_len))
    }
}
