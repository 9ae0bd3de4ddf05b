//! Topic routing keys of the form `<source>.<audience>`.

use std::fmt;

/// Exchange shared by the authority and its followers.
pub const DEFAULT_EXCHANGE: &str = "users_topic";

/// A two-word routing key: who sent it and who should hear it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutingKey {
    source: String,
    audience: String,
}

impl RoutingKey {
    pub fn new(source: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            audience: audience.into(),
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        let (source, audience) = key.split_once('.')?;
        if source.is_empty() || audience.is_empty() || audience.contains('.') {
            return None;
        }
        Some(Self::new(source, audience))
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Binding pattern that receives this audience from any source (`*.<audience>`).
    pub fn audience_pattern(audience: &str) -> String {
        format!("*.{audience}")
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.source, self.audience)
    }
}

/// AMQP topic matching: words are dot-separated, `*` matches exactly one
/// word and `#` matches zero or more words.
pub fn topic_matches(pattern: &str, key: &str) -> bool {
    let p: Vec<&str> = pattern.split('.').collect();
    let k: Vec<&str> = key.split('.').collect();
    match_words(&p, &k)
}

fn match_words(p: &[&str], k: &[&str]) -> bool {
    match (p.split_first(), k.split_first()) {
        (None, None) => true,
        (Some((&"#", rest)), _) => {
            match_words(rest, k) || (!k.is_empty() && match_words(p, &k[1..]))
        }
        (Some((&"*", rest)), Some((_, krest))) => match_words(rest, krest),
        (Some((pw, rest)), Some((kw, krest))) if pw == kw => match_words(rest, krest),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_matches_exactly_one_word() {
        assert!(topic_matches("*.req", "users.req"));
        assert!(topic_matches("*.users", "owncloud.users"));
        assert!(!topic_matches("*.req", "owncloud.users"));
        assert!(!topic_matches("*.req", "a.b.req"));
        assert!(!topic_matches("*.req", "req"));
    }

    #[test]
    fn hash_matches_zero_or_more_words() {
        assert!(topic_matches("#", "users.req"));
        assert!(topic_matches("users.#", "users"));
        assert!(topic_matches("users.#", "users.req.extra"));
        assert!(topic_matches("#.users", "owncloud.users"));
        assert!(!topic_matches("users.#", "owncloud.users"));
    }

    #[test]
    fn literal_keys_must_match_exactly() {
        assert!(topic_matches("users.req", "users.req"));
        assert!(!topic_matches("users.req", "users.reqs"));
    }

    #[test]
    fn routing_key_formats_and_parses() {
        let key = RoutingKey::new("owncloud", "users");
        assert_eq!(key.to_string(), "owncloud.users");
        assert_eq!(RoutingKey::parse("owncloud.users"), Some(key));
        assert_eq!(RoutingKey::parse("nodot"), None);
        assert_eq!(RoutingKey::parse("a.b.c"), None);
        assert_eq!(RoutingKey::audience_pattern("req"), "*.req");
    }
}
