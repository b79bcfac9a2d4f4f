//! Mr. Clean sweep engine
//!
//! Time-bounded retention sweeps over directory trees.
//!
//! # Overview
//!
//! A sweep applies an ordered list of [`RetentionRule`](mrclean_domain::RetentionRule)s.
//! Each rule names a root, a [`Strategy`](mrclean_domain::Strategy), an age
//! threshold and optional file-name masks. The engine is responsible for:
//! - **Age-based deletion**: Removing files and directory trees older than the cutoff
//! - **Time budgets**: A [`Watchdog`] bounds how long one rule may scan
//! - **Cooperative cancellation**: A [`CancellationSignal`] stops the sweep at the next entry
//! - **Failure isolation**: Permission errors, vanished entries and rule failures never stop the sweep
//! - **Structured events**: Every decision is reported to an [`EventSink`]
//!
//! ## Strategies
//!
//! | Id | Deletes | Masks | Keeps directory tree |
//! |----|---------|-------|----------------------|
//! | **0** | Stale files and subtrees below the root, then the root itself | No | No |
//! | **1** | Stale subdirectories with their contents | No | No |
//! | **2** | Stale files at any depth | Yes | Yes |
//! | **3** | Stale files at any depth, logging each subdirectory | Yes | Yes |
//! | **4** | Stale files at any depth | Yes | Yes |
//!
//! # Usage
//!
//! ## One-time Sweep
//!
//! ```no_run
//! use mrclean_domain::{MaskSet, RetentionRule, Strategy};
//! use mrclean_engine::{CancellationSignal, EngineConfig, Sweeper};
//!
//! let rules = vec![RetentionRule::new(
//!     "reports",
//!     "/srv/reports",
//!     Strategy::DeleteStaleSubdirsOnly,
//!     30,
//!     MaskSet::default(),
//! )];
//!
//! let mut sweeper = Sweeper::new(EngineConfig::default());
//! let report = sweeper.sweep(&rules, &CancellationSignal::new());
//! println!("{}", report.metrics.summary());
//! ```
//!
//! ## Background Worker
//!
//! ```no_run
//! use mrclean_engine::{EngineConfig, Sweeper, SweepWorker};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let worker = SweepWorker::new(Sweeper::new(EngineConfig::default()));
//!
//!     // Sweep every hour until Ctrl+C
//!     worker.run_every(&[], Duration::from_secs(3600), None).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration Presets
//!
//! ```
//! use mrclean_engine::EngineConfig;
//!
//! // Default: three minutes per rule
//! let config = EngineConfig::default();
//!
//! // Strict: one minute per rule
//! let config = EngineConfig::strict();
//!
//! // Relaxed: ten minutes per rule
//! let config = EngineConfig::relaxed();
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod event;
mod matcher;
mod metrics;
mod remover;
mod stamp;
mod sweeper;
mod traversal;
mod watchdog;
mod worker;

pub use config::{AgeBasis, EngineConfig};
pub use error::EngineError;
pub use event::{EntryKind, EventSink, MemorySink, SkipReason, SweepEvent, SweepStatus, TracingSink};
pub use matcher::MaskMatcher;
pub use metrics::SweepMetrics;
pub use remover::{FsRemover, Removal, Remover, SafeRemover};
pub use stamp::{check_access, entry_stamp, is_accessible, EntryStamp};
pub use sweeper::{LogRetention, RuleOutcome, RuleReport, SweepReport, Sweeper};
pub use traversal::{DirPolicy, FilePolicy, NodeOrder, ResetPoint, RootPolicy, TraversalPlan, Walk};
pub use watchdog::Watchdog;
pub use worker::SweepWorker;

/// Shared stop request observed by every sweep checkpoint
///
/// Cloning yields a handle to the same signal; cancelling any clone stops
/// the sweep at the next entry boundary.
pub type CancellationSignal = tokio_util::sync::CancellationToken;
