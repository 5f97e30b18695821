//! Rule list sanitization.
//!
//! Turns raw settings input (a comma-separated string from a form post, or an
//! already split list from persisted configuration) into a [`RuleSet`].
//! Sanitization is lossy: tokens that do not parse are dropped without error.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use tracing::debug;

use crate::rule::{parse_rule, Rule};

/// Ordered, deduplicated set of block rules.
///
/// Deduplication is textual: `10.0.0.0/24` and `10.0.0.1/24` are both kept
/// even though they cover the same range. Insertion order is preserved so the
/// generated `.htaccess` block is deterministic.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
    seen: HashSet<String>,
}

impl PartialEq for RuleSet {
    fn eq(&self, other: &Self) -> bool {
        self.rules == other.rules
    }
}

impl Eq for RuleSet {}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule unless one with the same textual form is already present.
    /// Returns `true` if the rule was added.
    pub fn insert(&mut self, rule: Rule) -> bool {
        if !self.seen.insert(rule.to_string()) {
            return false;
        }
        self.rules.push(rule);
        true
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Normalized textual form of every rule, in order.
    pub fn to_strings(&self) -> Vec<String> {
        self.rules.iter().map(Rule::to_string).collect()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        let mut set = RuleSet::new();
        for rule in iter {
            set.insert(rule);
        }
        set
    }
}

/// Raw rule list as supplied by the settings store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleListInput {
    /// Comma-separated text, e.g. `"1.2.3.4, 10.0.0.0/8"`.
    Text(String),
    /// Pre-split tokens.
    List(Vec<String>),
}

impl From<&str> for RuleListInput {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for RuleListInput {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<String>> for RuleListInput {
    fn from(tokens: Vec<String>) -> Self {
        Self::List(tokens)
    }
}

impl From<Vec<&str>> for RuleListInput {
    fn from(tokens: Vec<&str>) -> Self {
        Self::List(tokens.into_iter().map(String::from).collect())
    }
}

/// Sanitize raw settings input into a [`RuleSet`].
///
/// # Examples
/// ```
/// use simple_ip_blocker::sanitize::sanitize;
/// let rules = sanitize("1.2.3.4,1.2.3.4,bad,5.6.7.8/24");
/// assert_eq!(rules.to_strings(), vec!["1.2.3.4", "5.6.7.8/24"]);
/// ```
pub fn sanitize(input: impl Into<RuleListInput>) -> RuleSet {
    match input.into() {
        RuleListInput::Text(text) => sanitize_str(&text),
        RuleListInput::List(tokens) => sanitize_tokens(&tokens),
    }
}

/// Split comma-separated text and sanitize each token.
pub fn sanitize_str(text: &str) -> RuleSet {
    if text.trim().is_empty() {
        return RuleSet::new();
    }
    sanitize_tokens(text.split(','))
}

/// Sanitize already split tokens. Invalid tokens are dropped, duplicates
/// (by normalized text) keep their first position.
pub fn sanitize_tokens<I, S>(tokens: I) -> RuleSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut set = RuleSet::new();

    for token in tokens {
        match parse_rule(token.as_ref()) {
            Ok(rule) => {
                set.insert(rule);
            }
            Err(e) => debug!("Dropping rule token: {}", e),
        }
    }

    set
}

impl Serialize for RuleSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.rules.iter().map(Rule::to_string))
    }
}

impl<'de> Deserialize<'de> for RuleSet {
    /// Accepts either a comma-separated string or a sequence of strings and
    /// sanitizes it, so hand-edited config never yields invalid rules.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<RuleListInput>::deserialize(deserializer)? {
            Some(raw) => Ok(sanitize(raw)),
            None => Ok(RuleSet::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_drops_duplicates_and_garbage() {
        let rules = sanitize("1.2.3.4,1.2.3.4,bad,5.6.7.8/24");
        assert_eq!(rules.len(), 2);
        let expected: Vec<Rule> = vec![
            "1.2.3.4".parse().unwrap(),
            "5.6.7.8/24".parse().unwrap(),
        ];
        assert_eq!(rules.iter().cloned().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_sanitize_empty_inputs() {
        assert!(sanitize("").is_empty());
        assert!(sanitize("   ").is_empty());
        assert!(sanitize(Vec::<String>::new()).is_empty());
        assert!(sanitize(",,,").is_empty());
    }

    #[test]
    fn test_sanitize_trims_tokens() {
        let rules = sanitize(" 10.0.0.1 ,\n10.0.0.2\t");
        assert_eq!(rules.to_strings(), vec!["10.0.0.1", "10.0.0.2"]);
    }

    #[test]
    fn test_sanitize_list_used_as_is() {
        // A list entry is one token; commas inside it are not split
        let rules = sanitize(vec!["1.1.1.1", "2.2.2.2,3.3.3.3", "4.4.4.4"]);
        assert_eq!(rules.to_strings(), vec!["1.1.1.1", "4.4.4.4"]);
    }

    #[test]
    fn test_sanitize_preserves_first_seen_order() {
        let rules = sanitize("9.9.9.9,1.1.1.1,9.9.9.9,5.5.5.5");
        assert_eq!(rules.to_strings(), vec!["9.9.9.9", "1.1.1.1", "5.5.5.5"]);
    }

    #[test]
    fn test_sanitize_dedup_is_textual_after_normalization() {
        // Same normalized text collapses
        let rules = sanitize("10.0.0.0/24,10.0.0.0/024, 10.0.0.0 / 24");
        assert_eq!(rules.to_strings(), vec!["10.0.0.0/24"]);

        // Overlapping but textually different ranges are kept
        let rules = sanitize("10.0.0.0/24,10.0.0.1/24");
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn test_sanitize_mixed_v4_v6() {
        let rules = sanitize("::1, 127.0.0.1, 2001:db8::/32");
        assert_eq!(rules.to_strings(), vec!["::1", "127.0.0.1"]);
    }

    #[test]
    fn test_rule_set_insert_dedups() {
        let mut set = RuleSet::new();
        assert!(set.insert("1.2.3.4".parse().unwrap()));
        assert!(!set.insert("1.2.3.4".parse().unwrap()));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_rule_set_collects_large_input() {
        let rules: RuleSet = (0..60_000u32)
            .map(|i| Rule::Literal(std::net::Ipv4Addr::from(0x0A00_0000 + i).into()))
            .chain(std::iter::once("10.0.0.0".parse().unwrap()))
            .collect();
        assert_eq!(rules.len(), 60_000);
        assert_eq!(rules.to_strings()[59_999], "10.0.234.95");
    }

    #[test]
    fn test_rule_set_from_iterator() {
        let set: RuleSet = ["1.2.3.4", "1.2.3.4", "8.8.8.0/24"]
            .iter()
            .map(|s| s.parse::<Rule>().unwrap())
            .collect();
        assert_eq!(set.to_strings(), vec!["1.2.3.4", "8.8.8.0/24"]);
    }

    #[test]
    fn test_rule_set_serializes_as_strings() {
        let rules = sanitize("1.2.3.4,10.0.0.0/8");
        let yaml = serde_yaml::to_string(&rules).unwrap();
        let plain: Vec<String> = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(plain, vec!["1.2.3.4", "10.0.0.0/8"]);
    }

    #[test]
    fn test_rule_set_deserializes_text_and_list() {
        let from_text: RuleSet = serde_yaml::from_str("\"1.2.3.4, bad, 10.0.0.0/8\"").unwrap();
        assert_eq!(from_text.to_strings(), vec!["1.2.3.4", "10.0.0.0/8"]);

        let from_list: RuleSet = serde_yaml::from_str("- 1.2.3.4\n- nope\n- 10.0.0.0/8\n").unwrap();
        assert_eq!(from_list, from_text);

        let from_null: RuleSet = serde_yaml::from_str("~").unwrap();
        assert!(from_null.is_empty());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Sanitizing never panics and never yields duplicate text
        #[test]
        fn prop_sanitize_unique(input in "[0-9./, a-z]{0,80}") {
            let rules = sanitize(input.as_str());
            let texts = rules.to_strings();
            let unique: HashSet<_> = texts.iter().collect();
            prop_assert_eq!(unique.len(), texts.len());
        }

        /// Sanitizing an already sanitized list is the identity
        #[test]
        fn prop_sanitize_idempotent(octets in prop::collection::vec((0u8..=255, 0u8..=255, 0u8..=32), 0..20)) {
            let text = octets
                .iter()
                .map(|(a, b, p)| format!("{}.{}.0.1/{}", a, b, p))
                .collect::<Vec<_>>()
                .join(",");
            let once = sanitize(text.as_str());
            let twice = sanitize(once.to_strings());
            prop_assert_eq!(once, twice);
        }
    }
}
