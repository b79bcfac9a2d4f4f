//! Structured events emitted while sweeping
//!
//! The engine never formats output itself. Every observable decision is an
//! [`SweepEvent`] handed to an [`EventSink`]; [`TracingSink`] renders them as
//! log lines and [`MemorySink`] keeps them for inspection.

use mrclean_domain::{MaskSet, Strategy};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::time::Duration;

/// Kind of filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file (symlinks are treated as files)
    File,
    /// Directory, removed together with its contents
    Directory,
}

impl EntryKind {
    /// Human label
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
        }
    }
}

/// Why an entry was left in place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Read+write access denied
    Permission,
    /// Entry vanished between discovery and action
    NotFound,
    /// File name matched none of the rule's masks
    NoMatch,
    /// Entry could not be inspected for another reason
    Unreadable,
}

/// Overall result of a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SweepStatus {
    /// Every rule ran (individual rules may still have failed)
    Completed,
    /// A stop was requested; remaining work was abandoned
    Cancelled,
}

/// One observable engine decision
#[derive(Debug, Clone, PartialEq)]
pub enum SweepEvent {
    /// A rule started scanning its root
    ScanStarted {
        /// Rule label
        rule: String,
        /// Root being scanned
        root: PathBuf,
        /// Strategy in effect
        strategy: Strategy,
        /// Age threshold in days
        max_age_days: u64,
        /// Masks in effect (all-match for strategies that ignore masks)
        masks: MaskSet,
    },

    /// An entry was removed (or would have been, in dry-run mode)
    EntryDeleted {
        /// Removed path
        path: PathBuf,
        /// File or directory tree
        kind: EntryKind,
        /// True when nothing was actually removed
        dry_run: bool,
    },

    /// An entry was left in place
    EntrySkipped {
        /// Skipped path
        path: PathBuf,
        /// File or directory
        kind: EntryKind,
        /// Reason
        reason: SkipReason,
    },

    /// Removal failed for an unclassified reason
    RemovalFailed {
        /// Path that could not be removed
        path: PathBuf,
        /// File or directory tree
        kind: EntryKind,
        /// Error text
        error: String,
    },

    /// A rule ran out of time and abandoned its remaining work
    RuleBudgetExceeded {
        /// Root of the rule
        root: PathBuf,
        /// Configured budget
        budget: Duration,
    },

    /// A rule ended with an unexpected error
    RuleFailed {
        /// Root of the rule
        root: PathBuf,
        /// Error text
        error: String,
    },

    /// The sweep is over
    SweepFinished {
        /// Completion or forced stop
        status: SweepStatus,
    },
}

/// Receiver of sweep events
///
/// Sinks are called synchronously from the traversal thread and must not block.
pub trait EventSink: Send + Sync {
    /// Handle one event
    fn emit(&self, event: &SweepEvent);
}

/// Renders events as `tracing` log lines
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &SweepEvent) {
        match event {
            SweepEvent::ScanStarted {
                rule,
                root,
                strategy,
                max_age_days,
                masks,
            } => {
                tracing::info!("~ ~ ~ ~ ~ ~ ~ ~ ~ ~");
                tracing::info!(
                    rule = %rule,
                    "Scanning {}. Method: {}. Retention: {} {}. Mask: {}.",
                    root.display(),
                    strategy.id(),
                    max_age_days,
                    if *max_age_days == 1 { "day" } else { "days" },
                    masks
                );
            }
            SweepEvent::EntryDeleted { path, kind, dry_run } => {
                if *dry_run {
                    tracing::info!("DRY RUN: would delete {}: {}", kind.as_str(), path.display());
                } else {
                    tracing::info!("Deleted {}: {}", kind.as_str(), path.display());
                }
            }
            SweepEvent::EntrySkipped { path, kind, reason } => match reason {
                SkipReason::Permission => tracing::warn!(
                    "Insufficient read/write permissions for {} {} - skipping",
                    kind.as_str(),
                    path.display()
                ),
                SkipReason::NotFound => {
                    tracing::info!("{} not found: {}", kind.as_str(), path.display())
                }
                SkipReason::NoMatch => tracing::trace!("No mask matches {}", path.display()),
                SkipReason::Unreadable => tracing::warn!(
                    "Could not inspect {} {} - skipping",
                    kind.as_str(),
                    path.display()
                ),
            },
            SweepEvent::RemovalFailed { path, kind, error } => {
                tracing::error!("Failed to delete {} {}: {}", kind.as_str(), path.display(), error);
            }
            SweepEvent::RuleBudgetExceeded { root, budget } => {
                tracing::warn!(
                    "Scanning {} ran longer than {} s - skipping the rest",
                    root.display(),
                    budget.as_secs_f64()
                );
            }
            SweepEvent::RuleFailed { root, error } => {
                tracing::error!("Error while processing {}: {}", root.display(), error);
            }
            SweepEvent::SweepFinished { status } => match status {
                SweepStatus::Completed => tracing::info!("Cleanup finished."),
                SweepStatus::Cancelled => tracing::warn!("Cleanup stopped before completion."),
            },
        }
    }
}

/// Keeps every event in memory
///
/// Useful for embedding front ends that render their own view, and for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<SweepEvent>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events so far
    pub fn events(&self) -> Vec<SweepEvent> {
        self.events.lock().clone()
    }

    /// Paths reported as deleted, in order
    pub fn deleted_paths(&self) -> Vec<PathBuf> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SweepEvent::EntryDeleted { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    /// Drop recorded events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &SweepEvent) {
        self.events.lock().push(event.clone());
    }
}

impl<T: EventSink + ?Sized> EventSink for std::sync::Arc<T> {
    fn emit(&self, event: &SweepEvent) {
        (**self).emit(event);
    }
}
