//! Repository-local `.gitingest` override file.
//!
//! A deliberately tiny line parser, scoped to the single recognized key
//! `ignorePatterns`, not a general-purpose config format. The value is either
//! one quoted string or a bracketed comma-separated list of quoted strings.
//! Malformed or absent files are silently ignored.

use std::path::Path;

use tokio::fs;
use tracing::debug;

use crate::limiter::Limiter;

pub const OVERRIDE_FILE_NAME: &str = ".gitingest";

/// Read the override file at `root` and return any extra ignore patterns.
pub async fn load_ignore_overrides(root: &Path, limiter: &Limiter) -> Vec<String> {
    let path = root.join(OVERRIDE_FILE_NAME);
    match limiter.run(fs::read_to_string(&path)).await {
        Ok(text) => {
            let patterns = parse_ignore_overrides(&text);
            if !patterns.is_empty() {
                debug!(
                    path = %path.display(),
                    count = patterns.len(),
                    "loaded ignore overrides"
                );
            }
            patterns
        }
        Err(_) => Vec::new(),
    }
}

/// Parse `ignorePatterns = "one"` or `ignorePatterns = ["one", "two"]`.
pub fn parse_ignore_overrides(text: &str) -> Vec<String> {
    for line in text.lines() {
        let line = line.trim();
        let Some(rest) = line.strip_prefix("ignorePatterns") else {
            continue;
        };
        let Some(value) = rest.trim_start().strip_prefix('=') else {
            continue;
        };
        if let Some(patterns) = parse_value(value.trim()) {
            return patterns;
        }
    }
    Vec::new()
}

fn parse_value(value: &str) -> Option<Vec<String>> {
    if let Some(single) = parse_quoted(value) {
        return Some(vec![single]);
    }
    let inner = value.strip_prefix('[')?.strip_suffix(']')?;
    let mut patterns = Vec::new();
    for piece in inner.split(',') {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        patterns.push(parse_quoted(piece)?);
    }
    Some(patterns)
}

fn parse_quoted(value: &str) -> Option<String> {
    let inner = value.strip_prefix('"')?.strip_suffix('"')?;
    if inner.contains('"') {
        return None;
    }
    Some(inner.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_quoted_value() {
        let patterns = parse_ignore_overrides("ignorePatterns = \"secret.txt\"\n");
        assert_eq!(patterns, vec!["secret.txt"]);
    }

    #[test]
    fn parses_bracketed_list() {
        let patterns =
            parse_ignore_overrides("ignorePatterns = [\"*.log\", \"tmp/\", \"secret.txt\"]\n");
        assert_eq!(patterns, vec!["*.log", "tmp/", "secret.txt"]);
    }

    #[test]
    fn unknown_keys_and_noise_are_skipped() {
        let text = "title = \"x\"\n# comment\nignorePatterns = \"*.log\"\ntrailing = 1\n";
        assert_eq!(parse_ignore_overrides(text), vec!["*.log"]);
    }

    #[test]
    fn malformed_values_yield_nothing() {
        for text in [
            "ignorePatterns = unquoted",
            "ignorePatterns = [\"ok\", broken]",
            "ignorePatterns \"no equals\"",
            "ignorePatterns = [",
            "",
        ] {
            assert!(parse_ignore_overrides(text).is_empty(), "text {text:?}");
        }
    }

    #[tokio::test]
    async fn absent_file_yields_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let patterns = load_ignore_overrides(dir.path(), &Limiter::default()).await;
        assert!(patterns.is_empty());
    }
}
