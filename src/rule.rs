//! Block rule model and single-token address parsing.
//!
//! A rule is either a literal address or an IPv4 CIDR range. Range networks are
//! kept exactly as written; host bits are only masked off at match time.

use ipnet::Ipv4Net;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use crate::error::ParseError;

/// A single block rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    /// Exact address (IPv4 or IPv6).
    Literal(IpAddr),
    /// IPv4 network and prefix length (0..=32).
    Range(Ipv4Net),
}

impl Rule {
    pub fn is_range(&self) -> bool {
        matches!(self, Rule::Range(_))
    }

    /// The address as supplied, without the prefix.
    pub fn address(&self) -> IpAddr {
        match self {
            Rule::Literal(ip) => *ip,
            Rule::Range(net) => IpAddr::V4(net.addr()),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Literal(ip) => write!(f, "{}", ip),
            // Host bits stay visible, e.g. "10.0.0.7/24"
            Rule::Range(net) => write!(f, "{}/{}", net.addr(), net.prefix_len()),
        }
    }
}

impl FromStr for Rule {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_rule(s)
    }
}

/// Parse one user-supplied token into a [`Rule`].
///
/// The token is trimmed first. Tokens containing `/` must be an IPv4 address
/// followed by a decimal prefix in `0..=32`; the prefix is re-rendered, so
/// `"10.0.0.0/024"` becomes `10.0.0.0/24`. Anything else must be a plain IPv4
/// or IPv6 address.
///
/// # Examples
/// ```
/// use simple_ip_blocker::rule::parse_rule;
/// assert_eq!(parse_rule(" 192.168.1.1 ").unwrap().to_string(), "192.168.1.1");
/// assert_eq!(parse_rule("10.0.0.0/ 08").unwrap().to_string(), "10.0.0.0/8");
/// assert!(parse_rule("10.0.0.0/33").is_err());
/// assert!(parse_rule("2001:db8::/32").is_err());
/// ```
pub fn parse_rule(token: &str) -> Result<Rule, ParseError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ParseError::invalid(token));
    }

    match token.split_once('/') {
        Some((addr_part, prefix_part)) => {
            let prefix = parse_prefix(prefix_part.trim()).ok_or_else(|| ParseError::invalid(token))?;
            let addr: Ipv4Addr = addr_part
                .trim()
                .parse()
                .map_err(|_| ParseError::invalid(token))?;
            let net = Ipv4Net::new(addr, prefix).map_err(|_| ParseError::invalid(token))?;
            Ok(Rule::Range(net))
        }
        None => token
            .parse::<IpAddr>()
            .map(Rule::Literal)
            .map_err(|_| ParseError::invalid(token)),
    }
}

/// Decimal prefix length in `0..=32`. Leading zeros are accepted, signs are not.
fn parse_prefix(s: &str) -> Option<u8> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits = s.trim_start_matches('0');
    if digits.is_empty() {
        return Some(0);
    }
    // More than two significant digits can never be <= 32
    if digits.len() > 2 {
        return None;
    }
    digits.parse::<u8>().ok().filter(|p| *p <= 32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literal_v4() {
        let rule = parse_rule("192.168.1.1").unwrap();
        assert_eq!(rule, Rule::Literal("192.168.1.1".parse().unwrap()));
        assert!(!rule.is_range());
    }

    #[test]
    fn test_parse_literal_trims_whitespace() {
        let rule = parse_rule("\t 10.1.2.3 \n").unwrap();
        assert_eq!(rule.to_string(), "10.1.2.3");
    }

    #[test]
    fn test_parse_literal_v6() {
        let rule = parse_rule("2001:db8::1").unwrap();
        assert_eq!(rule, Rule::Literal("2001:db8::1".parse().unwrap()));
    }

    #[test]
    fn test_parse_literal_invalid() {
        assert!(parse_rule("").is_err());
        assert!(parse_rule("   ").is_err());
        assert!(parse_rule("bad").is_err());
        assert!(parse_rule("256.0.0.1").is_err());
        assert!(parse_rule("1.2.3").is_err());
        assert!(parse_rule("1.2.3.4.5").is_err());
        assert!(parse_rule("1.2.3.4 5").is_err());
    }

    #[test]
    fn test_parse_range() {
        let rule = parse_rule("10.0.0.0/24").unwrap();
        assert!(rule.is_range());
        assert_eq!(rule.to_string(), "10.0.0.0/24");
    }

    #[test]
    fn test_parse_range_keeps_host_bits() {
        let rule = parse_rule("5.6.7.8/24").unwrap();
        assert_eq!(rule.to_string(), "5.6.7.8/24");
        assert_eq!(rule.address(), "5.6.7.8".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_parse_range_normalizes_prefix() {
        assert_eq!(parse_rule("10.0.0.0/024").unwrap().to_string(), "10.0.0.0/24");
        assert_eq!(parse_rule("10.0.0.0/ 16").unwrap().to_string(), "10.0.0.0/16");
        assert_eq!(parse_rule("10.0.0.0 /8").unwrap().to_string(), "10.0.0.0/8");
        assert_eq!(parse_rule("10.0.0.0/000").unwrap().to_string(), "10.0.0.0/0");
    }

    #[test]
    fn test_parse_range_bounds() {
        assert!(parse_rule("0.0.0.0/0").is_ok());
        assert!(parse_rule("1.2.3.4/32").is_ok());
        assert!(parse_rule("1.2.3.4/33").is_err());
        assert!(parse_rule("1.2.3.4/100").is_err());
        assert!(parse_rule("1.2.3.4/0033").is_err());
    }

    #[test]
    fn test_parse_range_invalid_suffix() {
        assert!(parse_rule("1.2.3.4/").is_err());
        assert!(parse_rule("1.2.3.4/abc").is_err());
        assert!(parse_rule("1.2.3.4/-1").is_err());
        assert!(parse_rule("1.2.3.4/+8").is_err());
        assert!(parse_rule("1.2.3.4/8/8").is_err());
        assert!(parse_rule("/24").is_err());
    }

    #[test]
    fn test_parse_range_rejects_v6() {
        assert!(parse_rule("2001:db8::/32").is_err());
        assert!(parse_rule("::1/128").is_err());
    }

    #[test]
    fn test_from_str() {
        let rule: Rule = "172.16.0.0/12".parse().unwrap();
        assert_eq!(rule.to_string(), "172.16.0.0/12");
    }

    #[test]
    fn test_error_carries_trimmed_token() {
        let err = parse_rule("  nope ").unwrap_err();
        assert_eq!(err, ParseError::Invalid("nope".to_string()));
    }
}
