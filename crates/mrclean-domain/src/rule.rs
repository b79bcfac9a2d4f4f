//! Retention rule - a validated policy unit

use crate::{MaskSet, RuleError, Strategy};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Seconds in one retention day
pub const SECONDS_PER_DAY: u64 = 86_400;

/// One configured retention policy
///
/// # Examples
///
/// ```
/// use mrclean_domain::{MaskSet, RetentionRule, Strategy};
/// use std::time::{Duration, SystemTime};
///
/// let rule = RetentionRule::new(
///     "temp",
///     "/var/tmp/cache",
///     Strategy::DeleteStaleFilesKeepTree,
///     7,
///     MaskSet::parse("*.tmp"),
/// );
///
/// let now = SystemTime::now();
/// assert_eq!(rule.cutoff(now), now - Duration::from_secs(7 * 86_400));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionRule {
    /// Label of the configuration section (logging only)
    pub name: String,

    /// Normalised root directory
    pub root: PathBuf,

    /// Deletion strategy
    pub strategy: Strategy,

    /// Age threshold in days
    pub max_age_days: u64,

    /// File masks (ignored by strategies 0 and 1)
    pub masks: MaskSet,
}

impl RetentionRule {
    /// Create a rule from already-validated parts
    pub fn new(
        name: impl Into<String>,
        root: impl Into<PathBuf>,
        strategy: Strategy,
        max_age_days: u64,
        masks: MaskSet,
    ) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            strategy,
            max_age_days,
            masks,
        }
    }

    /// Validate raw configuration values into a rule
    ///
    /// `path`, `method` and `days` are required; `mask` falls back to `*.*`.
    /// The path is normalised with [`normalize_root`] and must be absolute.
    pub fn from_parts(
        name: &str,
        path: Option<&str>,
        method: Option<i64>,
        days: Option<i64>,
        mask: Option<&str>,
    ) -> Result<Self, RuleError> {
        let missing = |field| RuleError::MissingField {
            rule: name.to_string(),
            field,
        };

        let raw_path = path.ok_or_else(|| missing("path"))?;
        let method = method.ok_or_else(|| missing("method"))?;
        let days = days.ok_or_else(|| missing("days"))?;

        let strategy = u8::try_from(method)
            .ok()
            .and_then(Strategy::from_id)
            .ok_or(RuleError::UnknownStrategy {
                rule: name.to_string(),
                id: method,
            })?;

        let max_age_days = u64::try_from(days).map_err(|_| RuleError::NegativeAge {
            rule: name.to_string(),
            days,
        })?;

        let root = normalize_root(raw_path);
        if root.as_os_str().is_empty() {
            return Err(RuleError::EmptyRoot {
                rule: name.to_string(),
            });
        }
        if !root.is_absolute() {
            return Err(RuleError::RelativeRoot {
                rule: name.to_string(),
                root: root.display().to_string(),
            });
        }

        let masks = mask.map(MaskSet::parse).unwrap_or_default();

        Ok(Self::new(name, root, strategy, max_age_days, masks))
    }

    /// Age threshold as a duration
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_days.saturating_mul(SECONDS_PER_DAY))
    }

    /// Absolute cutoff instant for a sweep starting at `now`
    ///
    /// Entries strictly older than the cutoff are stale. Saturates at the
    /// Unix epoch for very large thresholds.
    pub fn cutoff(&self, now: SystemTime) -> SystemTime {
        now.checked_sub(self.max_age()).unwrap_or(UNIX_EPOCH)
    }

    /// Masks that apply to this rule's strategy, if any
    pub fn effective_masks(&self) -> Option<&MaskSet> {
        self.strategy.uses_masks().then_some(&self.masks)
    }

    /// Whether `path` names this rule's root (case-insensitive on Windows)
    pub fn targets(&self, path: &Path) -> bool {
        if cfg!(windows) {
            self.root.to_string_lossy().to_lowercase() == path.to_string_lossy().to_lowercase()
        } else {
            self.root == path
        }
    }
}

/// Normalise a configured root path
///
/// Strips surrounding whitespace and quotes, then expands environment
/// variables written as `$VAR`, `${VAR}` or `%VAR%`. Unknown variables are
/// left verbatim.
pub fn normalize_root(raw: &str) -> PathBuf {
    let trimmed = raw.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    PathBuf::from(expand_vars(trimmed, |name| std::env::var(name).ok()))
}

fn expand_vars(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find(['$', '%']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        let (name, consumed) = if let Some(body) = tail.strip_prefix("${") {
            match body.find('}') {
                Some(end) => (&body[..end], end + 3),
                None => ("", 0),
            }
        } else if let Some(body) = tail.strip_prefix('%') {
            match body.find('%') {
                Some(end) if end > 0 => (&body[..end], end + 2),
                _ => ("", 0),
            }
        } else {
            let body = &tail[1..];
            let end = body
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(body.len());
            (&body[..end], end + 1)
        };

        match (name.is_empty(), lookup(name)) {
            (false, Some(value)) => {
                out.push_str(&value);
                rest = &tail[consumed..];
            }
            (false, None) => {
                out.push_str(&tail[..consumed]);
                rest = &tail[consumed..];
            }
            (true, _) => {
                out.push_str(&tail[..1]);
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}
