//! Pattern engine: normalization, validation and matching of include/exclude
//! patterns.
//!
//! The pattern language is a deliberate subset of globbing: `*` matches any
//! run of zero or more characters and everything else is literal. Each
//! accepted pattern is compiled once into an anchored regex with all other
//! metacharacters escaped, so user input never reaches the regex engine
//! uninterpreted.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use tracing::debug;

use crate::error::IngestError;
use crate::ignore_defaults::DEFAULT_IGNORE_PATTERNS;

/// Characters allowed in a pattern besides ASCII alphanumerics.
const ALLOWED_PUNCTUATION: &[char] = &['-', '_', '.', '/', '+', '*', '@'];

/// Caller-supplied pattern input: either a raw string to be split on commas
/// and whitespace, or a pre-built set of individual patterns.
#[derive(Debug, Clone)]
pub enum PatternInput {
    Raw(String),
    Set(HashSet<String>),
}

impl From<&str> for PatternInput {
    fn from(raw: &str) -> Self {
        PatternInput::Raw(raw.to_string())
    }
}

impl From<String> for PatternInput {
    fn from(raw: String) -> Self {
        PatternInput::Raw(raw)
    }
}

impl From<HashSet<String>> for PatternInput {
    fn from(set: HashSet<String>) -> Self {
        PatternInput::Set(set)
    }
}

/// Strip leading separators; a pattern naming a directory (trailing `/`)
/// covers the directory and everything under it.
pub fn normalize_pattern(pattern: &str) -> String {
    let mut normalized = pattern.trim_start_matches('/').to_string();
    if normalized.ends_with('/') {
        normalized.push('*');
    }
    normalized
}

fn validate_pattern(pattern: &str) -> Result<(), IngestError> {
    let valid = pattern
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || ALLOWED_PUNCTUATION.contains(&c));
    if valid {
        Ok(())
    } else {
        Err(IngestError::InvalidPattern {
            pattern: pattern.to_string(),
        })
    }
}

/// A deduplicated set of normalized patterns with one compiled matcher each.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    matchers: HashMap<String, Regex>,
}

impl PatternSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The fixed baseline exclude catalog.
    pub fn defaults() -> Self {
        let mut set = Self::empty();
        for pattern in DEFAULT_IGNORE_PATTERNS {
            // The catalog is restricted to the validator's character set.
            set.insert(pattern)
                .expect("default catalog patterns are valid");
        }
        set
    }

    /// Validate and normalize every pattern in `input`.
    pub fn from_input(input: &PatternInput) -> Result<Self, IngestError> {
        match input {
            PatternInput::Raw(raw) => Self::parse(raw),
            PatternInput::Set(patterns) => {
                let mut set = Self::empty();
                for pattern in patterns {
                    set.insert(pattern)?;
                }
                Ok(set)
            }
        }
    }

    /// Split a raw string on commas and whitespace runs into patterns.
    pub fn parse(raw: &str) -> Result<Self, IngestError> {
        let mut set = Self::empty();
        for piece in raw.split([',', ' ', '\t', '\n', '\r']) {
            if !piece.is_empty() {
                set.insert(piece)?;
            }
        }
        Ok(set)
    }

    /// Validate, normalize and add one pattern. Duplicates collapse.
    pub fn insert(&mut self, pattern: &str) -> Result<(), IngestError> {
        validate_pattern(pattern)?;
        let normalized = normalize_pattern(pattern);
        if normalized.is_empty() {
            return Ok(());
        }
        if !self.matchers.contains_key(&normalized) {
            let matcher = compile_wildcard(&normalized)?;
            self.matchers.insert(normalized, matcher);
        }
        Ok(())
    }

    /// Union-merge all patterns from `other` into this set.
    pub fn merge(&mut self, other: &PatternSet) {
        for (pattern, matcher) in &other.matchers {
            self.matchers
                .entry(pattern.clone())
                .or_insert_with(|| matcher.clone());
        }
    }

    /// Remove every pattern of `include` from this set by exact string match.
    /// This is the include-over-exclude override rule.
    pub fn subtract(&mut self, include: &PatternSet) {
        for pattern in include.matchers.keys() {
            if self.matchers.remove(pattern).is_some() {
                debug!(pattern = %pattern, "include pattern overrides exclude");
            }
        }
    }

    /// Whether the forward-slash relative `path` matches any pattern in full.
    pub fn matches(&self, path: &str) -> bool {
        self.matchers.values().any(|matcher| matcher.is_match(path))
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.matchers.contains_key(pattern)
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.matchers.keys().map(String::as_str)
    }
}

/// Compile a normalized pattern into an anchored regex where only `*` is a
/// wildcard.
fn compile_wildcard(pattern: &str) -> Result<Regex, IngestError> {
    let escaped = regex::escape(pattern).replace("\\*", ".*");
    Regex::new(&format!("^{escaped}$")).map_err(|_| IngestError::InvalidPattern {
        pattern: pattern.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["/src/", "dir/", "*.rs", "a/b/c", "//deep/nested/"] {
            let once = normalize_pattern(raw);
            assert_eq!(normalize_pattern(&once), once, "pattern {raw:?}");
        }
    }

    #[test]
    fn trailing_separator_covers_subtree() {
        assert_eq!(normalize_pattern("dir/"), "dir/*");
        let set = PatternSet::parse("dir/").expect("valid pattern");
        assert!(set.matches("dir/file.txt"));
        assert!(set.matches("dir/nested/deep.txt"));
        assert!(!set.matches("dir"));
        assert!(!set.matches("other/dir/file.txt"));
    }

    #[test]
    fn rejects_disallowed_characters() {
        for bad in ["a|b", "src/{x}", "a b?", "semi;colon", "quo\"te"] {
            let err = PatternSet::from_input(&PatternInput::Raw(bad.to_string()));
            assert!(
                matches!(err, Err(IngestError::InvalidPattern { .. })),
                "pattern {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn parse_splits_on_commas_and_whitespace() {
        let set = PatternSet::parse("*.rs, *.toml\tdocs/  *.rs").expect("valid patterns");
        assert_eq!(set.len(), 3);
        assert!(set.contains("*.rs"));
        assert!(set.contains("*.toml"));
        assert!(set.contains("docs/*"));
    }

    #[test]
    fn star_matches_any_run_including_separators() {
        let set = PatternSet::parse("src/*").expect("valid pattern");
        assert!(set.matches("src/lib.rs"));
        assert!(set.matches("src/nested/mod.rs"));
        assert!(set.matches("src/"));
        assert!(!set.matches("src"));
    }

    #[test]
    fn other_metacharacters_stay_literal() {
        let set = PatternSet::parse("a.b+c").expect("valid pattern");
        assert!(set.matches("a.b+c"));
        assert!(!set.matches("aXb+c"));
        assert!(!set.matches("a.bbc"));
    }

    #[test]
    fn match_is_anchored_start_to_end() {
        let set = PatternSet::parse("*.rs").expect("valid pattern");
        assert!(set.matches("main.rs"));
        assert!(set.matches("src/main.rs"));
        assert!(!set.matches("main.rs.bak"));
    }

    #[test]
    fn include_override_removes_exact_excludes() {
        let mut exclude = PatternSet::parse("*.log, *.rs").expect("valid patterns");
        let include = PatternSet::parse("*.rs").expect("valid pattern");
        exclude.subtract(&include);
        assert!(!exclude.contains("*.rs"));
        assert!(!exclude.matches("main.rs"));
        assert!(exclude.matches("run.log"));
    }

    #[test]
    fn merge_is_a_union() {
        let mut a = PatternSet::parse("*.log").expect("valid");
        let b = PatternSet::parse("*.log, *.tmp").expect("valid");
        a.merge(&b);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn default_catalog_is_valid_and_nonempty() {
        let defaults = PatternSet::defaults();
        // Every catalog entry must survive normalization into the set, not
        // just the right number of them.
        for pattern in DEFAULT_IGNORE_PATTERNS {
            assert!(
                defaults.contains(&normalize_pattern(pattern)),
                "catalog entry {pattern:?} missing from the default set"
            );
        }
        assert!(defaults.matches(".git/config"));
        assert!(defaults.matches("node_modules/react/index.js"));
        assert!(defaults.matches("app.min.js"));
    }

    #[test]
    fn prebuilt_set_input_is_accepted() {
        let mut raw = HashSet::new();
        raw.insert("*.rs".to_string());
        raw.insert("docs/".to_string());
        let set = PatternSet::from_input(&PatternInput::Set(raw)).expect("valid set");
        assert!(set.contains("*.rs"));
        assert!(set.contains("docs/*"));
    }
}
