//! Mr. Clean Domain Layer
//!
//! This crate contains the retention model shared by the sweep engine and the
//! command-line front end. It has ZERO external dependencies and defines the
//! policy values that every other layer consumes.
//!
//! ## Key Concepts
//!
//! - **Rule**: one configured (root, strategy, age, mask) retention policy
//! - **Strategy**: one of five deletion algorithms, selected by id `0`–`4`
//! - **Cutoff**: the instant below which an entry is stale, fixed once per rule
//! - **Mask**: a glob pattern restricting which file names may be deleted
//!
//! ## Architecture
//!
//! - No external crate dependencies
//! - Pure policy values and validation only
//! - Filesystem access lives in `mrclean-engine`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod mask;
pub mod rule;
pub mod strategy;

// Re-exports for convenience
pub use error::RuleError;
pub use mask::{MaskSet, MATCH_ALL};
pub use rule::{normalize_root, RetentionRule, SECONDS_PER_DAY};
pub use strategy::Strategy;
