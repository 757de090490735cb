//! Glob matching for local-tier invalidation.
//!
//! Mirrors the subset of Redis `MATCH` syntax the cache uses: `*` matches
//! any run of characters, `?` exactly one, everything else is literal and the
//! whole key must match.

use regex::Regex;

#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    regex: Option<Regex>,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> Self {
        let mut expr = String::with_capacity(pattern.len() + 8);
        expr.push_str("(?s)^");
        let mut literal = [0u8; 4];
        for ch in pattern.chars() {
            match ch {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                other => expr.push_str(&regex::escape(other.encode_utf8(&mut literal))),
            }
        }
        expr.push('$');

        let regex = match Regex::new(&expr) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!(pattern = %pattern, error = %e, "unusable cache key pattern, matching nothing");
                None
            }
        };

        Self {
            source: pattern.to_string(),
            regex,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, key: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_matches_any_suffix() {
        let p = GlobPattern::new("a:*");
        assert!(p.matches("a:1"));
        assert!(p.matches("a:"));
        assert!(p.matches("a:1:2"));
        assert!(!p.matches("b:1"));
    }

    #[test]
    fn match_is_anchored() {
        let p = GlobPattern::new("a:*");
        assert!(!p.matches("xa:1"));
        let p = GlobPattern::new("*-v1");
        assert!(p.matches("users-v1"));
        assert!(!p.matches("users-v10"));
    }

    #[test]
    fn question_mark_matches_one_char() {
        let p = GlobPattern::new("users-metrics-v?:*");
        assert!(p.matches("users-metrics-v2:30:all"));
        assert!(!p.matches("users-metrics-v12:30:all"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let p = GlobPattern::new("docs.(list)+:*");
        assert!(p.matches("docs.(list)+:true"));
        assert!(!p.matches("docsX(list)+:true"));
        assert!(!p.matches("docs.listlist:true"));
    }

    #[test]
    fn multibyte_literals() {
        let p = GlobPattern::new("région:*");
        assert!(p.matches("région:eu"));
        assert!(!p.matches("region:eu"));
    }
}
