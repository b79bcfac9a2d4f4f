//! Entry timestamps and access probes

use crate::AgeBasis;
use std::fs::Metadata;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// Timestamp used to judge an entry, tagged with its provenance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStamp {
    /// Creation (birth) time reported by the platform
    Created(SystemTime),
    /// Last modification time, either requested or used as a fallback
    Modified(SystemTime),
}

impl EntryStamp {
    /// The instant itself
    pub fn time(&self) -> SystemTime {
        match self {
            EntryStamp::Created(t) | EntryStamp::Modified(t) => *t,
        }
    }

    /// Strictly older than `cutoff`
    pub fn is_older_than(&self, cutoff: SystemTime) -> bool {
        self.time() < cutoff
    }
}

/// Read an entry's stamp from its metadata
///
/// With [`AgeBasis::Created`] the creation time is used when the platform
/// provides it and the modification time otherwise.
pub fn entry_stamp(metadata: &Metadata, basis: AgeBasis) -> io::Result<EntryStamp> {
    match basis {
        AgeBasis::Modified => metadata.modified().map(EntryStamp::Modified),
        AgeBasis::Created => match metadata.created() {
            Ok(created) => Ok(EntryStamp::Created(created)),
            Err(_) => metadata.modified().map(EntryStamp::Modified),
        },
    }
}

/// Probe read+write access to `path`
///
/// Fails with `NotFound` when the entry is gone and `PermissionDenied` (or
/// the platform's own error) when access is refused.
#[cfg(unix)]
pub fn check_access(path: &Path) -> io::Result<()> {
    use rustix::fs::{access, Access};
    access(path, Access::READ_OK | Access::WRITE_OK).map_err(io::Error::from)
}

/// Probe read+write access to `path`
///
/// Fails with `NotFound` when the entry is gone and `PermissionDenied` when
/// the entry is read-only.
#[cfg(not(unix))]
pub fn check_access(path: &Path) -> io::Result<()> {
    let metadata = std::fs::metadata(path)?;
    if metadata.permissions().readonly() {
        return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
    }
    Ok(())
}

/// Whether the current process may both read and write `path`
pub fn is_accessible(path: &Path) -> bool {
    check_access(path).is_ok()
}
