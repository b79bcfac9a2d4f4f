//! Mask module - file name patterns restricting mask-aware strategies

use std::fmt;

/// The all-match mask. A set consisting of exactly this pattern bypasses
/// glob matching entirely, so names without a `.` still qualify.
pub const MATCH_ALL: &str = "*.*";

/// Ordered, de-duplicated set of glob patterns
///
/// A `MaskSet` is never empty: absent or blank configuration yields the
/// all-match default `["*.*"]`.
///
/// # Examples
///
/// ```
/// use mrclean_domain::MaskSet;
///
/// let masks = MaskSet::parse("*.tmp, *.log,,*.TMP");
/// assert_eq!(masks.patterns(), &["*.tmp", "*.log", "*.TMP"]);
///
/// assert!(MaskSet::parse("  ").is_match_all());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MaskSet {
    patterns: Vec<String>,
}

impl MaskSet {
    /// The all-match default
    pub fn match_all() -> Self {
        Self {
            patterns: vec![MATCH_ALL.to_string()],
        }
    }

    /// Parse a comma-separated mask list
    pub fn parse(raw: &str) -> Self {
        Self::from_patterns(raw.split(','))
    }

    /// Build from individual patterns, dropping blanks and exact duplicates
    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut kept: Vec<String> = Vec::new();
        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            if pattern.is_empty() || kept.iter().any(|p| p == pattern) {
                continue;
            }
            kept.push(pattern.to_string());
        }

        if kept.is_empty() {
            Self::match_all()
        } else {
            Self { patterns: kept }
        }
    }

    /// Patterns in configured order
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// True iff the set is exactly `["*.*"]`
    pub fn is_match_all(&self) -> bool {
        self.patterns.len() == 1 && self.patterns[0] == MATCH_ALL
    }
}

impl Default for MaskSet {
    fn default() -> Self {
        Self::match_all()
    }
}

impl fmt::Display for MaskSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.patterns.join(", "))
    }
}
