//! Configuration file handling.
//!
//! One TOML file carries the global settings, the logging policy and the
//! ordered list of retention rules.

use crate::error::Result;
use mrclean_domain::{RetentionRule, RuleError};
use mrclean_engine::{AgeBasis, EngineConfig, LogRetention};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[cfg(windows)]
const DEFAULT_TEMP_ROOT: &str = "%TEMP%";
#[cfg(not(windows))]
const DEFAULT_TEMP_ROOT: &str = "/tmp";

/// Full configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Global settings
    #[serde(default)]
    pub settings: Settings,

    /// Run-log settings
    #[serde(default)]
    pub log: LogSettings,

    /// Retention rules, applied in order
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// Global sweep settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Maximum time spent on one rule
    #[serde(default = "default_cycle_time_limit")]
    pub cycle_time_limit_secs: u64,

    /// Report deletions without performing them
    #[serde(default)]
    pub dry_run: bool,

    /// Timestamp used to judge an entry's age
    #[serde(default)]
    pub age_basis: AgeBasis,
}

/// Run-log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    /// Write a log file per run
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Default filter directive (overridden by `RUST_LOG`)
    #[serde(default = "default_level")]
    pub level: String,

    /// Log files older than this are deleted before each sweep
    #[serde(default = "default_days_limit")]
    pub days_limit: u64,

    /// Log directory, relative to the config file unless absolute
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,
}

/// One retention rule as written in the file.
///
/// Fields are optional here so that a missing one is reported by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Free-form label used in logs
    #[serde(default)]
    pub name: Option<String>,

    /// Root directory; `$VAR` and `%VAR%` are expanded
    pub path: Option<String>,

    /// Strategy id, 0 to 4
    pub method: Option<i64>,

    /// Age threshold in days
    pub days: Option<i64>,

    /// Comma-separated file masks
    pub mask: Option<String>,
}

impl Config {
    /// Load configuration from `path`.
    ///
    /// A missing file is created with defaults first.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            eprintln!("Config file {} not found, creating defaults", path.display());
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, default_config_content())?;
        }

        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validate every rule, in file order.
    ///
    /// The first invalid rule aborts: a sweep never starts with a broken rule.
    pub fn retention_rules(&self) -> std::result::Result<Vec<RetentionRule>, RuleError> {
        self.rules
            .iter()
            .enumerate()
            .map(|(index, rule)| {
                let name = rule
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("rule {}", index + 1));
                RetentionRule::from_parts(
                    &name,
                    rule.path.as_deref(),
                    rule.method,
                    rule.days,
                    rule.mask.as_deref(),
                )
            })
            .collect()
    }

    /// Engine settings derived from this file.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            age_basis: self.settings.age_basis,
            dry_run: self.settings.dry_run,
            ..EngineConfig::default()
        }
        .with_time_budget(Duration::from_secs(self.settings.cycle_time_limit_secs))
    }

    /// Log directory resolved against `base`.
    pub fn log_directory(&self, base: &Path) -> PathBuf {
        if self.log.directory.is_absolute() {
            self.log.directory.clone()
        } else {
            base.join(&self.log.directory)
        }
    }

    /// Retention applied to the run logs, when logging is enabled.
    pub fn log_retention(&self, base: &Path) -> Option<LogRetention> {
        self.log
            .enabled
            .then(|| LogRetention::new(self.log_directory(base), self.log.days_limit))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cycle_time_limit_secs: default_cycle_time_limit(),
            dry_run: false,
            age_basis: AgeBasis::default(),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_level(),
            days_limit: default_days_limit(),
            directory: default_log_directory(),
        }
    }
}

fn default_cycle_time_limit() -> u64 {
    180
}

fn default_true() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

fn default_days_limit() -> u64 {
    7
}

fn default_log_directory() -> PathBuf {
    PathBuf::from("LOGS")
}

/// Commented default configuration written on first run.
pub fn default_config_content() -> String {
    format!(
        r#"# Mr. Clean configuration

[settings]
# Maximum time (seconds) spent on one rule before it is abandoned
cycle_time_limit_secs = 180
# Report what would be deleted without deleting anything
dry_run = false
# Age basis: "created" (falls back to modification time) or "modified"
age_basis = "created"

[log]
# Write a log file per run
enabled = true
# Level: trace, debug, info, warn, error
level = "info"
# Log files older than this many days are deleted
days_limit = 7
# Log directory, relative to this file
directory = "LOGS"

# Methods:
# 0 - delete stale files and directories, then the root itself if stale
# 1 - delete stale subdirectories with their contents only
# 2 - delete stale files matching the mask at any depth
# 3 - delete stale files in subdirectories, keeping the directories
# 4 - delete stale files everywhere, keeping the directory structure
#
# [[rules]]
# name = "Folder Logs"
# path = "/var/log/myapp"
# method = 2
# days = 7
# mask = "*.log"

[[rules]]
name = "Folder Temp"
path = "{DEFAULT_TEMP_ROOT}"
method = 4
days = 30
mask = "*.tmp, *.log"
"#
    )
}
