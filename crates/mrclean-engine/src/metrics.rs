//! Metrics collection for sweep operations

use crate::event::{EntryKind, SkipReason};
use crate::sweeper::RuleOutcome;
use std::collections::HashMap;

/// Metrics collected during sweeps
///
/// Tracks deletions per entry kind, skips per reason and rule outcomes.
#[derive(Debug, Clone, Default)]
pub struct SweepMetrics {
    /// Entries deleted per kind (dry-run deletions included)
    pub deleted: HashMap<EntryKind, usize>,

    /// Entries left in place per reason
    pub skipped: HashMap<SkipReason, usize>,

    /// Removals that failed for an unclassified reason
    pub removal_failures: usize,

    /// Rules that ran to completion
    pub rules_completed: usize,

    /// Rules that ran out of time
    pub rules_over_budget: usize,

    /// Rules that ended with an unexpected error
    pub rules_failed: usize,

    /// Rules whose root did not exist
    pub rules_missing_root: usize,

    /// Rules interrupted by a stop request
    pub rules_cancelled: usize,

    /// Total sweep iterations completed
    pub sweep_count: usize,

    /// Total runtime in milliseconds
    pub total_runtime_ms: u64,
}

impl SweepMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a deletion
    pub fn record_deletion(&mut self, kind: EntryKind) {
        *self.deleted.entry(kind).or_insert(0) += 1;
    }

    /// Record a skipped entry
    pub fn record_skip(&mut self, reason: SkipReason) {
        *self.skipped.entry(reason).or_insert(0) += 1;
    }

    /// Record a failed removal
    pub fn record_failure(&mut self) {
        self.removal_failures += 1;
    }

    /// Record how a rule ended
    pub fn record_outcome(&mut self, outcome: &RuleOutcome) {
        match outcome {
            RuleOutcome::Completed => self.rules_completed += 1,
            RuleOutcome::BudgetExceeded => self.rules_over_budget += 1,
            RuleOutcome::Failed(_) => self.rules_failed += 1,
            RuleOutcome::MissingRoot => self.rules_missing_root += 1,
            RuleOutcome::Cancelled => self.rules_cancelled += 1,
        }
    }

    /// Record a sweep cycle completion
    pub fn record_sweep(&mut self) {
        self.sweep_count += 1;
    }

    /// Files deleted
    pub fn files_deleted(&self) -> usize {
        self.deleted.get(&EntryKind::File).copied().unwrap_or(0)
    }

    /// Directory trees deleted
    pub fn dirs_deleted(&self) -> usize {
        self.deleted.get(&EntryKind::Directory).copied().unwrap_or(0)
    }

    /// Get total entries deleted
    pub fn total_deleted(&self) -> usize {
        self.deleted.values().sum()
    }

    /// Get total entries skipped for a reason
    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Sweep Metrics Summary".to_string(),
            "=====================".to_string(),
            format!("Sweep cycles: {}", self.sweep_count),
            format!("Total runtime: {}ms", self.total_runtime_ms),
            format!(
                "Deleted: {} files, {} directories",
                self.files_deleted(),
                self.dirs_deleted()
            ),
            format!("Removal failures: {}", self.removal_failures),
            format!(
                "Rules: {} completed, {} over budget, {} failed, {} missing root, {} cancelled",
                self.rules_completed,
                self.rules_over_budget,
                self.rules_failed,
                self.rules_missing_root,
                self.rules_cancelled
            ),
        ];

        if !self.skipped.is_empty() {
            lines.push("Skipped by reason:".to_string());
            let mut reasons: Vec<_> = self.skipped.iter().collect();
            reasons.sort_by_key(|(reason, _)| format!("{:?}", reason));
            for (reason, count) in reasons {
                lines.push(format!("  {:?}: {}", reason, count));
            }
        }

        lines.join("\n")
    }
}
