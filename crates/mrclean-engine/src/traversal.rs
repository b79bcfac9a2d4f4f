//! Traversal core shared by all five strategies
//!
//! Every strategy is a [`TraversalPlan`]: a walk order plus what to do with
//! files, directories and the root. One [`Traversal`] executes any plan, so
//! checkpoints, access probes, age comparison and removal bookkeeping exist
//! exactly once.
//!
//! | Strategy | Walk | Files | Directories | Root |
//! |----------|------|-------|-------------|------|
//! | 0 | recursive, post-order | delete stale (no masks) | delete stale trees | delete if stale |
//! | 1 | walkdir, pre-order | keep | delete stale trees | keep |
//! | 2 | walkdir, pre-order | delete stale matching | keep | keep |
//! | 3 | recursive, pre-order | delete stale matching | keep | keep |
//! | 4 | explicit stack | delete stale matching | keep | keep |

use crate::event::{EntryKind, EventSink, SkipReason, SweepEvent};
use crate::matcher::MaskMatcher;
use crate::metrics::SweepMetrics;
use crate::remover::{Removal, SafeRemover};
use crate::stamp::{check_access, entry_stamp, EntryStamp};
use crate::watchdog::Watchdog;
use crate::{AgeBasis, CancellationSignal};
use mrclean_domain::Strategy;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Why a traversal stopped before finishing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Halt {
    Cancelled,
    BudgetExceeded,
}

pub(crate) type Flow<T = ()> = Result<T, Halt>;

/// Order in which a directory is judged relative to its contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOrder {
    /// Directory first, then its contents
    PreOrder,
    /// Contents first, then the directory
    PostOrder,
}

/// How the tree is walked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    /// `walkdir` iterator, pre-order
    Walker,
    /// Explicit stack of pending directories, top-down
    Stack,
    /// Recursive descent
    Recursive(NodeOrder),
}

/// What happens to files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilePolicy {
    /// Files are never touched
    Keep,
    /// Stale files (matching the masks, if any) are deleted
    DeleteStale,
}

/// What happens to directories below the root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirPolicy {
    /// Directories are never removed
    Keep,
    /// Stale directories are removed with everything inside them
    DeleteStaleTree,
}

/// When the watchdog is rebased
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetPoint {
    /// The budget covers the whole rule
    Never,
    /// The budget restarts whenever a directory is entered
    PerDirectory,
}

/// What happens to the root itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootPolicy {
    /// The root always survives
    Keep,
    /// After the walk, the root tree is removed if the root is stale
    DeleteIfStale,
}

/// Configuration of the traversal core for one strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalPlan {
    /// Walk order
    pub walk: Walk,
    /// File handling
    pub files: FilePolicy,
    /// Directory handling
    pub dirs: DirPolicy,
    /// Watchdog reset policy
    pub reset: ResetPoint,
    /// Root handling
    pub root: RootPolicy,
}

impl TraversalPlan {
    /// The plan implementing `strategy`
    pub fn for_strategy(strategy: Strategy) -> Self {
        match strategy {
            Strategy::DeleteTreeIfStale => Self {
                walk: Walk::Recursive(NodeOrder::PostOrder),
                files: FilePolicy::DeleteStale,
                dirs: DirPolicy::DeleteStaleTree,
                reset: ResetPoint::Never,
                root: RootPolicy::DeleteIfStale,
            },
            Strategy::DeleteStaleSubdirsOnly => Self {
                walk: Walk::Walker,
                files: FilePolicy::Keep,
                dirs: DirPolicy::DeleteStaleTree,
                reset: ResetPoint::PerDirectory,
                root: RootPolicy::Keep,
            },
            Strategy::DeleteStaleFilesAtRoot => Self {
                walk: Walk::Walker,
                files: FilePolicy::DeleteStale,
                dirs: DirPolicy::Keep,
                reset: ResetPoint::PerDirectory,
                root: RootPolicy::Keep,
            },
            Strategy::DeleteStaleFilesRecursive => Self {
                walk: Walk::Recursive(NodeOrder::PreOrder),
                files: FilePolicy::DeleteStale,
                dirs: DirPolicy::Keep,
                reset: ResetPoint::PerDirectory,
                root: RootPolicy::Keep,
            },
            Strategy::DeleteStaleFilesKeepTree => Self {
                walk: Walk::Stack,
                files: FilePolicy::DeleteStale,
                dirs: DirPolicy::Keep,
                reset: ResetPoint::PerDirectory,
                root: RootPolicy::Keep,
            },
        }
    }

    /// Whether any directory can be removed under this plan
    pub fn preserves_tree(&self) -> bool {
        self.dirs == DirPolicy::Keep && self.root == RootPolicy::Keep
    }
}

/// One rule's walk over its root
pub(crate) struct Traversal<'a> {
    pub plan: TraversalPlan,
    pub cutoff: SystemTime,
    pub basis: AgeBasis,
    /// `None` when the strategy ignores masks
    pub matcher: Option<&'a MaskMatcher>,
    pub watchdog: &'a Watchdog,
    pub cancel: &'a CancellationSignal,
    pub remover: SafeRemover<'a>,
    pub sink: &'a dyn EventSink,
    pub metrics: &'a mut SweepMetrics,
}

impl Traversal<'_> {
    /// Walk `root` according to the plan
    pub fn run(&mut self, root: &Path) -> Flow {
        self.checkpoint()?;

        if let Err(reason) = probe_dir(root) {
            self.skip(root, EntryKind::Directory, reason);
            return Ok(());
        }

        // Judged before the walk: removing children must not refresh the root's age
        let root_stamp = match self.plan.root {
            RootPolicy::DeleteIfStale => self.stamp(root, EntryKind::Directory),
            RootPolicy::Keep => None,
        };

        match self.plan.walk {
            Walk::Walker => self.walk_iter(root)?,
            Walk::Stack => self.walk_stack(root)?,
            Walk::Recursive(NodeOrder::PreOrder) => self.descend_pre(root)?,
            Walk::Recursive(NodeOrder::PostOrder) => self.descend_post(root)?,
        }

        if let Some(stamp) = root_stamp {
            self.checkpoint()?;
            if stamp.is_older_than(self.cutoff) {
                self.remove(root, EntryKind::Directory);
            }
        }

        Ok(())
    }

    fn checkpoint(&self) -> Flow {
        if self.cancel.is_cancelled() {
            return Err(Halt::Cancelled);
        }
        if self.watchdog.is_expired() {
            return Err(Halt::BudgetExceeded);
        }
        Ok(())
    }

    fn walk_iter(&mut self, root: &Path) -> Flow {
        let mut entries = WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        while let Some(next) = entries.next() {
            let entry = match next {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(root).to_path_buf();
                    match err.io_error() {
                        Some(io_err) => self.skip_io(&path, EntryKind::Directory, io_err),
                        None => self.skip(&path, EntryKind::Directory, SkipReason::Unreadable),
                    }
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                if !self.enter_dir(entry.path())? {
                    entries.skip_current_dir();
                }
            } else {
                self.visit_file(entry.path())?;
            }
        }

        Ok(())
    }

    fn walk_stack(&mut self, root: &Path) -> Flow {
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            self.checkpoint()?;
            if self.plan.reset == ResetPoint::PerDirectory {
                self.watchdog.reset();
            }

            let mut subdirs = Vec::new();
            for (path, is_dir) in self.list_dir(&dir) {
                if is_dir {
                    if self.enter_dir(&path)? {
                        subdirs.push(path);
                    }
                } else {
                    self.visit_file(&path)?;
                }
            }
            pending.extend(subdirs.into_iter().rev());
        }

        Ok(())
    }

    fn descend_pre(&mut self, dir: &Path) -> Flow {
        for (path, is_dir) in self.list_dir(dir) {
            if is_dir {
                if self.enter_dir(&path)? {
                    tracing::info!("Scanning subdirectory: {}", path.display());
                    self.descend_pre(&path)?;
                }
            } else {
                self.visit_file(&path)?;
            }
        }
        Ok(())
    }

    fn descend_post(&mut self, dir: &Path) -> Flow {
        for (path, is_dir) in self.list_dir(dir) {
            if !is_dir {
                self.visit_file(&path)?;
                continue;
            }

            self.checkpoint()?;
            if let Err(reason) = probe_dir(&path) {
                self.skip(&path, EntryKind::Directory, reason);
                continue;
            }

            let stamp = match self.plan.dirs {
                DirPolicy::DeleteStaleTree => self.stamp(&path, EntryKind::Directory),
                DirPolicy::Keep => None,
            };
            if self.plan.reset == ResetPoint::PerDirectory {
                self.watchdog.reset();
            }

            self.descend_post(&path)?;

            if stamp.is_some_and(|s| s.is_older_than(self.cutoff)) {
                self.remove(&path, EntryKind::Directory);
            }
        }
        Ok(())
    }

    /// Judge a directory on discovery; returns whether to descend into it
    fn enter_dir(&mut self, dir: &Path) -> Flow<bool> {
        self.checkpoint()?;

        if let Err(reason) = probe_dir(dir) {
            self.skip(dir, EntryKind::Directory, reason);
            return Ok(false);
        }

        if self.plan.dirs == DirPolicy::DeleteStaleTree {
            let Some(stamp) = self.stamp(dir, EntryKind::Directory) else {
                return Ok(false);
            };
            if stamp.is_older_than(self.cutoff) {
                self.remove(dir, EntryKind::Directory);
                return Ok(false);
            }
        }

        // The stack walk rebases when the directory is popped, not when it is queued
        if self.plan.reset == ResetPoint::PerDirectory && self.plan.walk != Walk::Stack {
            self.watchdog.reset();
        }
        Ok(true)
    }

    fn visit_file(&mut self, path: &Path) -> Flow {
        self.checkpoint()?;

        if self.plan.files == FilePolicy::Keep {
            return Ok(());
        }

        if let Some(matcher) = self.matcher {
            let name = path.file_name().unwrap_or(path.as_os_str());
            if !matcher.matches(name) {
                self.skip(path, EntryKind::File, SkipReason::NoMatch);
                return Ok(());
            }
        }

        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                self.skip_io(path, EntryKind::File, &e);
                return Ok(());
            }
        };

        // A link's own permissions are meaningless; removing it needs only the parent
        if !metadata.file_type().is_symlink() {
            if let Err(e) = check_access(path) {
                let reason = if e.kind() == ErrorKind::NotFound {
                    SkipReason::NotFound
                } else {
                    SkipReason::Permission
                };
                self.skip(path, EntryKind::File, reason);
                return Ok(());
            }
        }

        match entry_stamp(&metadata, self.basis) {
            Ok(stamp) if stamp.is_older_than(self.cutoff) => self.remove(path, EntryKind::File),
            Ok(_) => {}
            Err(e) => self.skip_io(path, EntryKind::File, &e),
        }
        Ok(())
    }

    fn list_dir(&mut self, dir: &Path) -> Vec<(PathBuf, bool)> {
        let reader = match fs::read_dir(dir) {
            Ok(reader) => reader,
            Err(e) => {
                self.skip_io(dir, EntryKind::Directory, &e);
                return Vec::new();
            }
        };

        let mut entries = Vec::new();
        for entry in reader {
            match entry {
                Ok(entry) => {
                    let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                    entries.push((entry.path(), is_dir));
                }
                Err(e) => self.skip_io(dir, EntryKind::Directory, &e),
            }
        }
        entries.sort();
        entries
    }

    fn stamp(&mut self, path: &Path, kind: EntryKind) -> Option<EntryStamp> {
        let stamp = fs::symlink_metadata(path).and_then(|m| entry_stamp(&m, self.basis));
        match stamp {
            Ok(stamp) => Some(stamp),
            Err(e) => {
                self.skip_io(path, kind, &e);
                None
            }
        }
    }

    fn remove(&mut self, path: &Path, kind: EntryKind) {
        match self.remover.remove(path, kind) {
            Removal::Removed | Removal::DryRun => self.metrics.record_deletion(kind),
            Removal::PermissionDenied(_) => self.metrics.record_skip(SkipReason::Permission),
            Removal::NotFound => self.metrics.record_skip(SkipReason::NotFound),
            Removal::Failed(_) => self.metrics.record_failure(),
        }
    }

    fn skip_io(&mut self, path: &Path, kind: EntryKind, err: &io::Error) {
        let reason = match err.kind() {
            ErrorKind::PermissionDenied => SkipReason::Permission,
            ErrorKind::NotFound => SkipReason::NotFound,
            _ => {
                tracing::debug!("Could not inspect {}: {}", path.display(), err);
                SkipReason::Unreadable
            }
        };
        self.skip(path, kind, reason);
    }

    fn skip(&mut self, path: &Path, kind: EntryKind, reason: SkipReason) {
        self.metrics.record_skip(reason);
        self.sink.emit(&SweepEvent::EntrySkipped {
            path: path.to_path_buf(),
            kind,
            reason,
        });
    }
}

fn probe_dir(dir: &Path) -> Result<(), SkipReason> {
    check_access(dir).map_err(|e| match e.kind() {
        ErrorKind::NotFound => SkipReason::NotFound,
        _ => SkipReason::Permission,
    })
}
