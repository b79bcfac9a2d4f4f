//! Removal of single files and directory trees
//!
//! [`SafeRemover`] is the only place the engine deletes anything. It never
//! returns an error: every failure is classified into a [`Removal`] and
//! reported as exactly one event, so the caller's traversal always moves on
//! to the next candidate.

use crate::event::{EntryKind, EventSink, SkipReason, SweepEvent};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::Path;

/// Filesystem operations used for deletion
pub trait Remover: Send + Sync {
    /// Remove one file (or symlink)
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Remove a directory and everything inside it
    fn remove_tree(&self, path: &Path) -> io::Result<()>;
}

/// [`Remover`] backed by `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct FsRemover;

impl Remover for FsRemover {
    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn remove_tree(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }
}

/// Classified result of one removal attempt
#[derive(Debug)]
pub enum Removal {
    /// Entry removed
    Removed,
    /// Dry-run mode; nothing touched
    DryRun,
    /// Access denied
    PermissionDenied(io::Error),
    /// Entry was already gone
    NotFound,
    /// Any other failure
    Failed(io::Error),
}

impl Removal {
    /// Whether the entry is (or would be) gone
    pub fn is_removed(&self) -> bool {
        matches!(self, Removal::Removed | Removal::DryRun)
    }
}

/// Failure-absorbing wrapper around a [`Remover`]
pub struct SafeRemover<'a> {
    remover: &'a dyn Remover,
    sink: &'a dyn EventSink,
    dry_run: bool,
}

impl<'a> SafeRemover<'a> {
    /// Wrap a remover; `dry_run` suppresses the actual filesystem call
    pub fn new(remover: &'a dyn Remover, sink: &'a dyn EventSink, dry_run: bool) -> Self {
        Self {
            remover,
            sink,
            dry_run,
        }
    }

    /// Remove `path` and report the outcome as one event
    pub fn remove(&self, path: &Path, kind: EntryKind) -> Removal {
        let result = if self.dry_run {
            Ok(())
        } else {
            match kind {
                EntryKind::File => self.remover.remove_file(path),
                EntryKind::Directory => self.remover.remove_tree(path),
            }
        };

        let removal = match result {
            Ok(()) if self.dry_run => Removal::DryRun,
            Ok(()) => Removal::Removed,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => Removal::PermissionDenied(e),
            Err(e) if e.kind() == ErrorKind::NotFound => Removal::NotFound,
            Err(e) => Removal::Failed(e),
        };

        let path = path.to_path_buf();
        let event = match &removal {
            Removal::Removed => SweepEvent::EntryDeleted {
                path,
                kind,
                dry_run: false,
            },
            Removal::DryRun => SweepEvent::EntryDeleted {
                path,
                kind,
                dry_run: true,
            },
            Removal::PermissionDenied(e) => {
                tracing::debug!("Access error while deleting {}: {}", path.display(), e);
                SweepEvent::EntrySkipped {
                    path,
                    kind,
                    reason: SkipReason::Permission,
                }
            }
            Removal::NotFound => SweepEvent::EntrySkipped {
                path,
                kind,
                reason: SkipReason::NotFound,
            },
            Removal::Failed(e) => SweepEvent::RemovalFailed {
                path,
                kind,
                error: e.to_string(),
            },
        };
        self.sink.emit(&event);

        removal
    }
}
