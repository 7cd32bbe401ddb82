//! GlobMatcher (§4, listed as "interface only; implementation delegated"):
//! case-insensitive pattern matching across in-archive paths. The core
//! needs only `?`/`*` wildcard matching to support commands filtering
//! archive entries; anything richer is a caller concern.

/// Case-insensitive glob match of `pattern` against `candidate`.
/// Supports `*` (any run of characters, including none) and `?` (exactly
/// one character). No character classes, no path-separator awareness
/// beyond treating `/` like any other character — archive-internal paths
/// are opaque strings to this matcher.
pub fn glob_match(pattern: &str, candidate: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().flat_map(|c| c.to_lowercase()).collect();
    let candidate: Vec<char> = candidate.chars().flat_map(|c| c.to_lowercase()).collect();
    matches(&pattern, &candidate)
}

fn matches(pattern: &[char], candidate: &[char]) -> bool {
    match pattern.first() {
        None => candidate.is_empty(),
        Some('*') => {
            matches(&pattern[1..], candidate)
                || (!candidate.is_empty() && matches(pattern, &candidate[1..]))
        }
        Some('?') => !candidate.is_empty() && matches(&pattern[1..], &candidate[1..]),
        Some(p) => {
            !candidate.is_empty() && *p == candidate[0] && matches(&pattern[1..], &candidate[1..])
        }
    }
}

pub struct GlobMatcher {
    pattern: String,
}

impl GlobMatcher {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        glob_match(&self.pattern, candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        assert!(glob_match("FILE.TXT", "file.txt"));
    }

    #[test]
    fn star_matches_any_run() {
        assert!(glob_match("*.shk", "INNER.SHK"));
        assert!(glob_match("a*b", "ab"));
        assert!(glob_match("a*b", "axxxb"));
        assert!(!glob_match("a*b", "axxxc"));
    }

    #[test]
    fn question_mark_matches_one_char() {
        assert!(glob_match("FILE.??T", "file.txt"));
        assert!(!glob_match("FILE.??T", "file.tt"));
    }

    #[test]
    fn matcher_struct_delegates() {
        let matcher = GlobMatcher::new("DIR/*");
        assert!(matcher.is_match("dir/inner.shk"));
        assert!(!matcher.is_match("other/inner.shk"));
    }
}
