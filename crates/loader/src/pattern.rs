// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! File name wildcard patterns
//!
//! A pattern applies to a single file name, never to a path. `*` matches any
//! run of characters (including none); every other character is literal.
//! Examples:
//! - "Credit Data - *.csv" -> ["Credit Data - ", ".csv"]
//! - "*.xlsx" -> ["", ".xlsx"]
//! - "NPS Data.xlsx" -> no wildcard, exact match

use crate::{Error, Result};

/// A compiled file name pattern
#[derive(Debug, Clone, PartialEq)]
pub struct FilePattern {
    /// Literal segments separated by wildcards. A pattern without '*' has
    /// exactly one segment.
    segments: Vec<String>,
}

impl FilePattern {
    pub fn new<S: AsRef<str>>(pattern: S) -> Result<Self> {
        let pattern = pattern.as_ref();
        if pattern.is_empty() {
            return Err(Error::config("file pattern cannot be empty"));
        }
        if pattern.contains('/') || pattern.contains('\\') {
            return Err(Error::config(format!(
                "file pattern '{pattern}' must name files, not paths"
            )));
        }
        Ok(Self {
            segments: pattern.split('*').map(str::to_string).collect(),
        })
    }

    /// True when the pattern contains at least one wildcard
    pub fn has_wildcard(&self) -> bool {
        self.segments.len() > 1
    }

    /// Match a file name. Returns what each wildcard matched, in order.
    pub fn captures<S: AsRef<str>>(&self, name: S) -> Option<Vec<String>> {
        let name = name.as_ref();

        let (first, rest) = self.segments.split_first()?;
        if rest.is_empty() {
            return (name == first).then(Vec::new);
        }
        if !name.starts_with(first.as_str()) {
            return None;
        }

        let mut pos = first.len();
        let mut captures = Vec::with_capacity(rest.len());

        for (i, segment) in rest.iter().enumerate() {
            let last = i == rest.len() - 1;
            let remaining = &name[pos..];

            if last {
                // The final literal anchors at the end of the name
                if remaining.len() < segment.len() || !remaining.ends_with(segment.as_str()) {
                    return None;
                }
                let end = name.len() - segment.len();
                captures.push(name[pos..end].to_string());
                pos = name.len();
            } else if segment.is_empty() {
                // Consecutive wildcards: the first one matches nothing
                captures.push(String::new());
            } else {
                let found_at = remaining.find(segment.as_str())?;
                captures.push(remaining[..found_at].to_string());
                pos += found_at + segment.len();
            }
        }

        debug_assert_eq!(pos, name.len());
        Some(captures)
    }

    pub fn matches<S: AsRef<str>>(&self, name: S) -> bool {
        self.captures(name).is_some()
    }
}

impl std::fmt::Display for FilePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments.join("*"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_pattern() {
        let pattern = FilePattern::new("Credit Data - *.csv").unwrap();
        assert!(pattern.has_wildcard());
        assert_eq!(
            pattern.captures("Credit Data - 05-03-2026.csv"),
            Some(vec!["05-03-2026".to_string()])
        );
        assert!(!pattern.matches("Credit Data - 05-03-2026.xlsx"));
        assert!(!pattern.matches("credit data - 05-03-2026.csv"));
        assert!(!pattern.matches("Other Credit Data - 05-03-2026.csv"));
    }

    #[test]
    fn test_exact_pattern() {
        let pattern = FilePattern::new("NPS Data.xlsx").unwrap();
        assert!(!pattern.has_wildcard());
        assert_eq!(pattern.captures("NPS Data.xlsx"), Some(vec![]));
        assert!(!pattern.matches("NPS Data.xlsx.bak"));
    }

    #[test]
    fn test_leading_and_trailing_wildcards() {
        let pattern = FilePattern::new("*Data*").unwrap();
        assert_eq!(
            pattern.captures("Credit Data - x.csv"),
            Some(vec!["Credit ".to_string(), " - x.csv".to_string()])
        );
        assert_eq!(
            FilePattern::new("*").unwrap().captures("anything"),
            Some(vec!["anything".to_string()])
        );
    }

    #[test]
    fn test_suffix_must_not_overlap_prefix() {
        // "a*a" needs at least two characters
        let pattern = FilePattern::new("a*a").unwrap();
        assert!(!pattern.matches("a"));
        assert!(pattern.matches("aa"));
        assert!(pattern.matches("aba"));
    }

    #[test]
    fn test_consecutive_wildcards() {
        let pattern = FilePattern::new("x**.csv").unwrap();
        assert_eq!(
            pattern.captures("x1.csv"),
            Some(vec![String::new(), "1".to_string()])
        );
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(FilePattern::new("").is_err());
        assert!(FilePattern::new("Raw/*.csv").is_err());
    }

    #[test]
    fn test_display_round_trips_source() {
        let pattern = FilePattern::new("Credit Data - *.csv").unwrap();
        assert_eq!(pattern.to_string(), "Credit Data - *.csv");
    }
}
