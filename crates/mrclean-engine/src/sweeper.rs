//! Sweep coordinator: runs every rule in order and isolates their failures

use crate::event::{EntryKind, EventSink, SkipReason, SweepEvent, SweepStatus, TracingSink};
use crate::matcher::MaskMatcher;
use crate::remover::{FsRemover, Remover, SafeRemover};
use crate::stamp::is_accessible;
use crate::traversal::{Halt, Traversal, TraversalPlan};
use crate::{CancellationSignal, EngineConfig, EngineError, SweepMetrics, Watchdog};
use mrclean_domain::{MaskSet, RetentionRule, Strategy};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

/// How one rule ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// The whole root was traversed
    Completed,
    /// The time budget ran out; remaining work was abandoned
    BudgetExceeded,
    /// A stop was requested while the rule was running
    Cancelled,
    /// The root does not exist (not an error)
    MissingRoot,
    /// The rule ended with an unexpected error
    Failed(String),
}

impl RuleOutcome {
    /// Whether this outcome counts against the sweep's health
    pub fn is_failure(&self) -> bool {
        matches!(self, RuleOutcome::Failed(_))
    }
}

/// Outcome of one rule within a sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleReport {
    /// Rule label
    pub name: String,
    /// Root that was scanned
    pub root: PathBuf,
    /// How the rule ended
    pub outcome: RuleOutcome,
}

/// Result of one full sweep
#[derive(Debug, Clone)]
pub struct SweepReport {
    /// Normal completion or forced stop
    pub status: SweepStatus,
    /// Outcome of the log-folder pass, when configured
    pub log_retention: Option<RuleOutcome>,
    /// One entry per rule that started, in configured order
    pub rules: Vec<RuleReport>,
    /// Cumulative metrics after this sweep
    pub metrics: SweepMetrics,
}

impl SweepReport {
    /// Rules that failed unexpectedly
    pub fn failed_rules(&self) -> impl Iterator<Item = &RuleReport> {
        self.rules.iter().filter(|r| r.outcome.is_failure())
    }
}

/// Log-folder retention applied before the configured rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRetention {
    /// Directory holding the tool's own run logs
    pub directory: PathBuf,
    /// Age threshold in days
    pub max_age_days: u64,
    /// Log file extension, without the dot
    pub extension: String,
}

impl LogRetention {
    /// Retention for `*.log` files in `directory`
    pub fn new(directory: impl Into<PathBuf>, max_age_days: u64) -> Self {
        Self {
            directory: directory.into(),
            max_age_days,
            extension: "log".to_string(),
        }
    }

    /// The strategy-2 rule equivalent to this policy
    pub fn as_rule(&self) -> RetentionRule {
        RetentionRule::new(
            "log retention",
            self.directory.clone(),
            Strategy::DeleteStaleFilesAtRoot,
            self.max_age_days,
            MaskSet::parse(&format!("*.{}", self.extension)),
        )
    }
}

/// Retention sweep engine
///
/// Runs rules strictly in order on the calling thread. Each rule gets its own
/// [`Watchdog`] and cutoff; failures of one rule never stop the next.
///
/// # Examples
///
/// ```no_run
/// use mrclean_domain::{MaskSet, RetentionRule, Strategy};
/// use mrclean_engine::{CancellationSignal, EngineConfig, Sweeper};
///
/// let rules = vec![RetentionRule::new(
///     "temp",
///     "/var/tmp/reports",
///     Strategy::DeleteStaleFilesKeepTree,
///     30,
///     MaskSet::parse("*.tmp, *.log"),
/// )];
///
/// let mut sweeper = Sweeper::new(EngineConfig::default());
/// let report = sweeper.sweep(&rules, &CancellationSignal::new());
/// println!("{}", report.metrics.summary());
/// ```
pub struct Sweeper {
    config: EngineConfig,
    sink: Arc<dyn EventSink>,
    remover: Box<dyn Remover>,
    log_retention: Option<LogRetention>,
    metrics: SweepMetrics,
}

impl Sweeper {
    /// Create a sweeper that logs events through `tracing`
    pub fn new(config: EngineConfig) -> Self {
        Self::with_sink(config, Arc::new(TracingSink))
    }

    /// Create a sweeper reporting to a custom sink
    pub fn with_sink(config: EngineConfig, sink: Arc<dyn EventSink>) -> Self {
        Self {
            config,
            sink,
            remover: Box::new(FsRemover),
            log_retention: None,
            metrics: SweepMetrics::new(),
        }
    }

    /// Replace the filesystem remover
    pub fn with_remover(mut self, remover: impl Remover + 'static) -> Self {
        self.remover = Box::new(remover);
        self
    }

    /// Prune the tool's own logs before each sweep
    pub fn with_log_retention(mut self, retention: LogRetention) -> Self {
        self.log_retention = Some(retention);
        self
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get a reference to the current metrics
    pub fn metrics(&self) -> &SweepMetrics {
        &self.metrics
    }

    /// Reset metrics counters
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    /// Run the full sweep now
    ///
    /// Blocks until every rule has run or `cancel` is observed. Rules after a
    /// cancellation never start.
    pub fn sweep(&mut self, rules: &[RetentionRule], cancel: &CancellationSignal) -> SweepReport {
        let start = Instant::now();

        tracing::info!("Methods:");
        for strategy in Strategy::ALL {
            tracing::info!("{} - {}", strategy.id(), strategy.describe());
        }
        if self.config.dry_run {
            tracing::info!("DRY RUN: nothing will be deleted");
        }
        tracing::info!("Starting cleanup ({} rules)", rules.len());

        let mut status = SweepStatus::Completed;

        let log_retention = match self.log_retention.clone() {
            Some(retention) if !cancel.is_cancelled() => {
                let outcome = self.prune_logs(&retention, cancel);
                if outcome == RuleOutcome::Cancelled {
                    status = SweepStatus::Cancelled;
                }
                Some(outcome)
            }
            _ => None,
        };

        let mut reports = Vec::with_capacity(rules.len());
        if status == SweepStatus::Completed {
            for rule in rules {
                if cancel.is_cancelled() {
                    status = SweepStatus::Cancelled;
                    break;
                }

                let resolved = resolve_rule(rules, rule);
                let outcome = self.run_rule(&resolved, cancel);
                self.metrics.record_outcome(&outcome);

                let cancelled = outcome == RuleOutcome::Cancelled;
                reports.push(RuleReport {
                    name: rule.name.clone(),
                    root: rule.root.clone(),
                    outcome,
                });
                if cancelled {
                    status = SweepStatus::Cancelled;
                    break;
                }
            }
        }
        if cancel.is_cancelled() {
            status = SweepStatus::Cancelled;
        }

        self.metrics.record_sweep();
        self.metrics.total_runtime_ms += u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.sink.emit(&SweepEvent::SweepFinished { status });

        SweepReport {
            status,
            log_retention,
            rules: reports,
            metrics: self.metrics.clone(),
        }
    }

    /// Run one rule in isolation
    ///
    /// Errors and panics are caught here and reported as
    /// [`RuleOutcome::Failed`].
    pub fn run_rule(&mut self, rule: &RetentionRule, cancel: &CancellationSignal) -> RuleOutcome {
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.execute(rule, cancel)));

        let error = match result {
            Ok(Ok(outcome)) => return outcome,
            Ok(Err(e)) => e,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                EngineError::Panic(message)
            }
        };

        tracing::debug!(rule = %rule.name, "Rule failed: {:?}", error);
        self.sink.emit(&SweepEvent::RuleFailed {
            root: rule.root.clone(),
            error: error.to_string(),
        });
        RuleOutcome::Failed(error.to_string())
    }

    /// Apply log retention to the tool's own log directory
    pub fn prune_logs(&mut self, retention: &LogRetention, cancel: &CancellationSignal) -> RuleOutcome {
        tracing::debug!("Pruning old logs in {}", retention.directory.display());

        if !retention.directory.exists() {
            tracing::warn!(
                "Log directory {} not found, creating it",
                retention.directory.display()
            );
            return match std::fs::create_dir_all(&retention.directory) {
                Ok(()) => RuleOutcome::Completed,
                Err(e) => {
                    let error = EngineError::Io {
                        path: retention.directory.clone(),
                        source: e,
                    };
                    self.sink.emit(&SweepEvent::RuleFailed {
                        root: retention.directory.clone(),
                        error: error.to_string(),
                    });
                    RuleOutcome::Failed(error.to_string())
                }
            };
        }

        if !is_accessible(&retention.directory) {
            tracing::error!(
                "No read/write access to log directory {}, skipping log cleanup",
                retention.directory.display()
            );
            self.metrics.record_skip(SkipReason::Permission);
            return RuleOutcome::Completed;
        }

        self.run_rule(&retention.as_rule(), cancel)
    }

    fn execute(
        &mut self,
        rule: &RetentionRule,
        cancel: &CancellationSignal,
    ) -> Result<RuleOutcome, EngineError> {
        if cancel.is_cancelled() {
            return Ok(RuleOutcome::Cancelled);
        }

        // One snapshot of "now" for the whole rule
        let cutoff = rule.cutoff(SystemTime::now());
        let masks = rule.effective_masks().cloned().unwrap_or_default();

        self.sink.emit(&SweepEvent::ScanStarted {
            rule: rule.name.clone(),
            root: rule.root.clone(),
            strategy: rule.strategy,
            max_age_days: rule.max_age_days,
            masks: masks.clone(),
        });

        match rule.root.try_exists() {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!("Directory {} not found", rule.root.display());
                self.metrics.record_skip(SkipReason::NotFound);
                self.sink.emit(&SweepEvent::EntrySkipped {
                    path: rule.root.clone(),
                    kind: EntryKind::Directory,
                    reason: SkipReason::NotFound,
                });
                return Ok(RuleOutcome::MissingRoot);
            }
            Err(source) => {
                return Err(EngineError::Io {
                    path: rule.root.clone(),
                    source,
                })
            }
        }
        if !rule.root.is_dir() {
            return Err(EngineError::NotADirectory(rule.root.clone()));
        }

        let matcher = match rule.effective_masks() {
            Some(_) => Some(MaskMatcher::new(&masks)?),
            None => None,
        };

        let mut watchdog =
            Watchdog::new(self.config.rule_time_budget(), self.config.watchdog_interval());
        watchdog.start()?;

        let result = Traversal {
            plan: TraversalPlan::for_strategy(rule.strategy),
            cutoff,
            basis: self.config.age_basis,
            matcher: matcher.as_ref(),
            watchdog: &watchdog,
            cancel,
            remover: SafeRemover::new(self.remover.as_ref(), self.sink.as_ref(), self.config.dry_run),
            sink: self.sink.as_ref(),
            metrics: &mut self.metrics,
        }
        .run(&rule.root);

        watchdog.stop();

        Ok(match result {
            Ok(()) => RuleOutcome::Completed,
            Err(Halt::Cancelled) => {
                tracing::debug!(rule = %rule.name, "Stop requested, abandoning rule");
                RuleOutcome::Cancelled
            }
            Err(Halt::BudgetExceeded) => {
                self.sink.emit(&SweepEvent::RuleBudgetExceeded {
                    root: rule.root.clone(),
                    budget: watchdog.limit(),
                });
                RuleOutcome::BudgetExceeded
            }
        })
    }
}

/// Masks are associated with a root path: the first rule naming the same root
/// supplies them.
fn resolve_rule(rules: &[RetentionRule], rule: &RetentionRule) -> RetentionRule {
    let owner = rules.iter().find(|r| r.targets(&rule.root)).unwrap_or(rule);
    RetentionRule {
        masks: owner.masks.clone(),
        ..rule.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::MemorySink;
    use crate::AgeBasis;
    use std::time::Duration;

    fn rule(name: &str, root: &str, masks: &str) -> RetentionRule {
        RetentionRule::new(name, root, Strategy::DeleteStaleFilesAtRoot, 1, MaskSet::parse(masks))
    }

    #[test]
    fn test_masks_resolve_by_first_rule_for_root() {
        let rules = vec![
            rule("a", "/srv/logs", "*.log"),
            rule("b", "/srv/logs", ""),
            rule("c", "/srv/tmp", ""),
        ];

        assert_eq!(resolve_rule(&rules, &rules[1]).masks, MaskSet::parse("*.log"));
        assert!(resolve_rule(&rules, &rules[2]).masks.is_match_all());
        assert_eq!(resolve_rule(&rules, &rules[1]).name, "b");
    }

    #[test]
    fn test_missing_root_is_not_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let sink = Arc::new(MemorySink::new());
        let mut sweeper = Sweeper::with_sink(EngineConfig::default(), sink.clone());

        let report = sweeper.sweep(
            &[RetentionRule::new("x", &missing, Strategy::DeleteTreeIfStale, 1, MaskSet::default())],
            &CancellationSignal::new(),
        );

        assert_eq!(report.status, SweepStatus::Completed);
        assert_eq!(report.rules[0].outcome, RuleOutcome::MissingRoot);
        assert_eq!(report.failed_rules().count(), 0);
        assert!(sink.events().contains(&SweepEvent::EntrySkipped {
            path: missing,
            kind: EntryKind::Directory,
            reason: SkipReason::NotFound,
        }));
    }

    #[test]
    fn test_root_that_is_a_file_fails_in_isolation() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, b"x").unwrap();
        let other = dir.path().join("other");
        std::fs::create_dir(&other).unwrap();

        let mut sweeper = Sweeper::with_sink(EngineConfig::default(), Arc::new(MemorySink::new()));
        let report = sweeper.sweep(
            &[
                RetentionRule::new("file", &file, Strategy::DeleteStaleFilesAtRoot, 1, MaskSet::default()),
                RetentionRule::new("dir", &other, Strategy::DeleteStaleFilesAtRoot, 1, MaskSet::default()),
            ],
            &CancellationSignal::new(),
        );

        assert!(matches!(report.rules[0].outcome, RuleOutcome::Failed(_)));
        assert_eq!(report.rules[1].outcome, RuleOutcome::Completed);
        assert_eq!(report.metrics.rules_failed, 1);
        assert!(file.exists());
    }

    #[test]
    fn test_invalid_mask_fails_rule() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(MemorySink::new());
        let mut sweeper = Sweeper::with_sink(EngineConfig::default(), sink.clone());

        let outcome = sweeper.run_rule(
            &RetentionRule::new("bad", dir.path(), Strategy::DeleteStaleFilesKeepTree, 0, MaskSet::parse("[")),
            &CancellationSignal::new(),
        );

        assert!(matches!(outcome, RuleOutcome::Failed(ref e) if e.contains("Invalid mask")));
        assert!(sink
            .events()
            .iter()
            .any(|e| matches!(e, SweepEvent::RuleFailed { .. })));
    }

    #[test]
    fn test_panicking_remover_is_contained() {
        struct PanickingRemover;

        impl Remover for PanickingRemover {
            fn remove_file(&self, _path: &std::path::Path) -> std::io::Result<()> {
                panic!("remover exploded");
            }

            fn remove_tree(&self, _path: &std::path::Path) -> std::io::Result<()> {
                panic!("remover exploded");
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.tmp");
        std::fs::write(&file, b"x").unwrap();
        let old = filetime::FileTime::from_system_time(SystemTime::now() - Duration::from_secs(10 * 86_400));
        filetime::set_file_mtime(&file, old).unwrap();

        let config = EngineConfig {
            age_basis: AgeBasis::Modified,
            ..EngineConfig::default()
        };
        let mut sweeper = Sweeper::with_sink(config, Arc::new(MemorySink::new()))
            .with_remover(PanickingRemover);
        let outcome = sweeper.run_rule(
            &RetentionRule::new("boom", dir.path(), Strategy::DeleteStaleFilesKeepTree, 1, MaskSet::default()),
            &CancellationSignal::new(),
        );

        assert_eq!(outcome, RuleOutcome::Failed("Rule panicked: remover exploded".to_string()));
    }

    #[test]
    fn test_pre_cancelled_sweep_starts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationSignal::new();
        cancel.cancel();

        let sink = Arc::new(MemorySink::new());
        let mut sweeper = Sweeper::with_sink(EngineConfig::default(), sink.clone());
        let report = sweeper.sweep(
            &[RetentionRule::new("x", dir.path(), Strategy::DeleteTreeIfStale, 0, MaskSet::default())],
            &cancel,
        );

        assert_eq!(report.status, SweepStatus::Cancelled);
        assert!(report.rules.is_empty());
        assert!(dir.path().exists());
        assert_eq!(
            sink.events(),
            vec![SweepEvent::SweepFinished {
                status: SweepStatus::Cancelled
            }]
        );
    }

    #[test]
    fn test_log_retention_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("LOGS");

        let mut sweeper = Sweeper::with_sink(EngineConfig::default(), Arc::new(MemorySink::new()))
            .with_log_retention(LogRetention::new(&logs, 7));
        let report = sweeper.sweep(&[], &CancellationSignal::new());

        assert_eq!(report.log_retention, Some(RuleOutcome::Completed));
        assert!(logs.is_dir());
    }

    #[test]
    fn test_log_retention_rule_shape() {
        let rule = LogRetention::new("/var/log/mrclean", 7).as_rule();
        assert_eq!(rule.strategy, Strategy::DeleteStaleFilesAtRoot);
        assert_eq!(rule.masks, MaskSet::parse("*.log"));
        assert_eq!(rule.max_age_days, 7);
    }
}
