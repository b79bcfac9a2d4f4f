//! Strategy module - the five deletion algorithms a rule can select

use std::fmt;

/// Deletion strategy of a retention rule
///
/// Strategies are configured by numeric id:
/// - `0` DeleteTreeIfStale: stale files and subtrees, then the root itself
/// - `1` DeleteStaleSubdirsOnly: stale subdirectories with their contents
/// - `2` DeleteStaleFilesAtRoot: stale matching files anywhere under the root
/// - `3` DeleteStaleFilesRecursive: stale matching files, recursive descent
/// - `4` DeleteStaleFilesKeepTree: stale matching files, iterative walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Strategy {
    /// Post-order walk deleting stale files and subtrees, then the root if stale
    DeleteTreeIfStale = 0,

    /// Delete stale subdirectories (and everything inside them) only
    DeleteStaleSubdirsOnly = 1,

    /// Delete stale files under the root at any depth; directories are kept
    DeleteStaleFilesAtRoot = 2,

    /// Recursive descent deleting stale files; directories are kept
    DeleteStaleFilesRecursive = 3,

    /// Iterative top-down walk deleting stale files; directories are kept
    DeleteStaleFilesKeepTree = 4,
}

impl Strategy {
    /// All strategies in id order
    pub const ALL: [Strategy; 5] = [
        Strategy::DeleteTreeIfStale,
        Strategy::DeleteStaleSubdirsOnly,
        Strategy::DeleteStaleFilesAtRoot,
        Strategy::DeleteStaleFilesRecursive,
        Strategy::DeleteStaleFilesKeepTree,
    ];

    /// Look up a strategy by its configured id
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    /// Numeric id as written in configuration
    pub fn id(&self) -> u8 {
        *self as u8
    }

    /// Get the strategy name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::DeleteTreeIfStale => "delete-tree-if-stale",
            Strategy::DeleteStaleSubdirsOnly => "delete-stale-subdirs-only",
            Strategy::DeleteStaleFilesAtRoot => "delete-stale-files-at-root",
            Strategy::DeleteStaleFilesRecursive => "delete-stale-files-recursive",
            Strategy::DeleteStaleFilesKeepTree => "delete-stale-files-keep-tree",
        }
    }

    /// One-line description for the legend logged at sweep start
    pub fn describe(&self) -> &'static str {
        match self {
            Strategy::DeleteTreeIfStale => "deletes files and directories with their contents",
            Strategy::DeleteStaleSubdirsOnly => "deletes only directories with their contents",
            Strategy::DeleteStaleFilesAtRoot => "deletes only files under the given path",
            Strategy::DeleteStaleFilesRecursive => {
                "deletes only files in subdirectories, keeping the subdirectories"
            }
            Strategy::DeleteStaleFilesKeepTree => {
                "deletes all files in the tree, preserving the directory structure"
            }
        }
    }

    /// Whether the rule's masks restrict which files may be deleted
    pub fn uses_masks(&self) -> bool {
        matches!(
            self,
            Strategy::DeleteStaleFilesAtRoot
                | Strategy::DeleteStaleFilesRecursive
                | Strategy::DeleteStaleFilesKeepTree
        )
    }
}

impl TryFrom<u8> for Strategy {
    type Error = u8;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::from_id(id).ok_or(id)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id(), self.as_str())
    }
}
