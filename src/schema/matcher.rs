//! Wildcard metric name matching.
//!
//! `*` and `#` each stand for one namespace segment made of
//! `[-a-zA-Z0-9_]`. Everything else, including `.`, matches literally and the
//! whole key has to match.

use regex::Regex;

/// Character class a wildcard token expands to.
const SEGMENT: &str = "[-a-zA-Z0-9_]+";

/// A wildcard name compiled into a regular expression.
#[derive(Debug, Clone)]
pub struct WildcardMatcher {
    regex: Regex,
}

impl WildcardMatcher {
    pub fn compile(pattern: &str) -> Result<Self, regex::Error> {
        let mut expr = String::with_capacity(pattern.len() + 16);
        expr.push('^');

        let mut literal = String::new();
        for c in pattern.chars() {
            if c == '*' || c == '#' {
                expr.push_str(&regex::escape(&literal));
                literal.clear();
                expr.push_str(SEGMENT);
            } else {
                literal.push(c);
            }
        }
        expr.push_str(&regex::escape(&literal));
        expr.push('$');

        Ok(Self {
            regex: Regex::new(&expr)?,
        })
    }

    pub fn is_match(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_matches_one_segment() {
        let m = WildcardMatcher::compile("throughput.#.read").unwrap();

        assert!(m.is_match("throughput.sda.read"));
        assert!(m.is_match("throughput.nvme0n1.read"));
        assert!(m.is_match("throughput.dm-0.read"));
        assert!(!m.is_match("throughput.sda.write"));
        assert!(!m.is_match("throughput..read"));
        assert!(!m.is_match("throughput.sda.sdb.read"));
    }

    #[test]
    fn test_star_behaves_like_hash() {
        let m = WildcardMatcher::compile("time.*.io").unwrap();
        assert!(m.is_match("time.vda.io"));
        assert!(!m.is_match("time.vda.ioWeighted"));
    }

    #[test]
    fn test_dot_is_literal() {
        let m = WildcardMatcher::compile("time.#.io").unwrap();
        assert!(!m.is_match("timeXvdaXio"));
    }

    #[test]
    fn test_anchored_both_ends() {
        let m = WildcardMatcher::compile("throughput.#.read").unwrap();
        assert!(!m.is_match("disk.throughput.sda.read"));
        assert!(!m.is_match("throughput.sda.readahead"));
    }

    #[test]
    fn test_regex_metacharacters_are_escaped() {
        let m = WildcardMatcher::compile("latency(p99).#").unwrap();
        assert!(m.is_match("latency(p99).sda"));
        assert!(!m.is_match("latencyp99.sda"));
    }
}
