//! Configuration for sweep operations
//!
//! Defines the per-rule time budget, watchdog cadence and operational modes.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which timestamp decides an entry's age
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeBasis {
    /// Creation time where the platform records it, modification time otherwise
    #[default]
    Created,

    /// Always the last modification time
    Modified,
}

/// Configuration for the sweep engine
///
/// Controls how long a single rule may scan, how often the watchdog checks
/// the budget, and whether deletions are actually performed.
///
/// # Examples
///
/// ```
/// use mrclean_engine::EngineConfig;
/// use std::time::Duration;
///
/// // Default configuration (3 minutes per rule)
/// let config = EngineConfig::default();
/// assert_eq!(config.rule_time_budget(), Duration::from_secs(180));
///
/// // Strict budget
/// let config = EngineConfig::strict();
/// assert_eq!(config.rule_time_budget(), Duration::from_secs(60));
///
/// // Relaxed budget
/// let config = EngineConfig::relaxed();
/// assert_eq!(config.rule_time_budget(), Duration::from_secs(600));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Soft deadline for scanning one rule (in milliseconds)
    /// Default: 180 000 (3 minutes)
    pub rule_time_budget_ms: u64,

    /// How often the watchdog compares elapsed time with the budget (in milliseconds)
    /// Clamped to 1..=1000. Default: 200
    #[serde(default = "default_watchdog_interval_ms")]
    pub watchdog_interval_ms: u64,

    /// Timestamp used to judge staleness
    /// Default: creation time
    #[serde(default)]
    pub age_basis: AgeBasis,

    /// Dry-run mode: report what would be deleted without deleting
    /// Default: false
    #[serde(default)]
    pub dry_run: bool,
}

fn default_watchdog_interval_ms() -> u64 {
    200
}

impl Default for EngineConfig {
    /// Create default configuration
    ///
    /// - Rule budget: 180 seconds
    /// - Watchdog interval: 200 ms
    /// - Age basis: creation time
    fn default() -> Self {
        Self {
            rule_time_budget_ms: 180_000,
            watchdog_interval_ms: default_watchdog_interval_ms(),
            age_basis: AgeBasis::Created,
            dry_run: false,
        }
    }
}

impl EngineConfig {
    /// Strict configuration (one minute per rule)
    ///
    /// Suitable for scheduled runs that must finish inside a maintenance window.
    pub fn strict() -> Self {
        Self {
            rule_time_budget_ms: 60_000,
            ..Self::default()
        }
    }

    /// Relaxed configuration (ten minutes per rule)
    ///
    /// Suitable for very large roots on slow storage.
    pub fn relaxed() -> Self {
        Self {
            rule_time_budget_ms: 600_000,
            ..Self::default()
        }
    }

    /// Override the per-rule budget
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.rule_time_budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Get the per-rule budget as Duration
    pub fn rule_time_budget(&self) -> Duration {
        Duration::from_millis(self.rule_time_budget_ms)
    }

    /// Get the watchdog check interval as Duration
    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms.clamp(1, 1000))
    }
}
