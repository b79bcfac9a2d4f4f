//! Error types for sweep operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can end a single rule early
///
/// None of these cross a rule boundary: the coordinator records them as a
/// failed rule and moves on.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A mask could not be compiled into a glob
    #[error("Invalid mask '{pattern}': {source}")]
    Mask {
        /// Offending pattern
        pattern: String,
        /// Underlying glob error
        #[source]
        source: globset::Error,
    },

    /// The watchdog timing thread could not be started
    #[error("Watchdog error: {0}")]
    Watchdog(#[source] std::io::Error),

    /// The root could not be inspected
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path being inspected
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The root exists but is not a directory
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// A rule panicked while traversing
    #[error("Rule panicked: {0}")]
    Panic(String),

    /// Worker error (tokio runtime issues)
    #[error("Worker error: {0}")]
    Worker(String),
}
