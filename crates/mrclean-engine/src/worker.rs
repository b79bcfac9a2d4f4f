//! Async driver for running sweeps on a schedule

use crate::{CancellationSignal, EngineError, SweepMetrics, SweepReport, SweepStatus, Sweeper};
use mrclean_domain::RetentionRule;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::time::{interval, Duration};

/// Runs a [`Sweeper`] off the async runtime and wires Ctrl+C to cancellation
///
/// The sweep itself is synchronous and runs on a blocking thread; this
/// worker only waits for it, forwards shutdown signals and repeats it.
///
/// # Examples
///
/// ```no_run
/// use mrclean_engine::{EngineConfig, Sweeper, SweepWorker};
/// use tokio;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let worker = SweepWorker::new(Sweeper::new(EngineConfig::default()));
///
///     // One sweep, stopped early by Ctrl+C
///     let report = worker.run_once(&[]).await?;
///     println!("{}", report.metrics.summary());
///     Ok(())
/// }
/// ```
pub struct SweepWorker {
    sweeper: Arc<Mutex<Sweeper>>,
    cancel: CancellationSignal,
}

impl SweepWorker {
    /// Wrap a configured sweeper
    pub fn new(sweeper: Sweeper) -> Self {
        Self {
            sweeper: Arc::new(Mutex::new(sweeper)),
            cancel: CancellationSignal::new(),
        }
    }

    /// Handle that stops the current and all future sweeps when cancelled
    pub fn cancel_signal(&self) -> CancellationSignal {
        self.cancel.clone()
    }

    /// Run one sweep
    ///
    /// Ctrl+C during the sweep requests cancellation; the sweep then stops at
    /// its next checkpoint and its partial report is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the blocking sweep task could not be joined.
    pub async fn run_once(&self, rules: &[RetentionRule]) -> Result<SweepReport, EngineError> {
        let sweeper = Arc::clone(&self.sweeper);
        let cancel = self.cancel.clone();
        let rules = rules.to_vec();

        let mut task = tokio::task::spawn_blocking(move || sweeper.lock().sweep(&rules, &cancel));

        let joined = tokio::select! {
            joined = &mut task => joined,
            _ = shutdown_signal() => {
                tracing::info!("Shutdown signal received, stopping sweep");
                self.cancel.cancel();
                task.await
            }
        };

        joined.map_err(|e| EngineError::Worker(e.to_string()))
    }

    /// Run a sweep every `period`
    ///
    /// Stops after `cycles` sweeps when given, otherwise when cancelled or on
    /// Ctrl+C. Returns the cumulative metrics.
    ///
    /// # Errors
    ///
    /// Returns an error if a sweep task could not be joined.
    pub async fn run_every(
        &self,
        rules: &[RetentionRule],
        period: Duration,
        cycles: Option<usize>,
    ) -> Result<SweepMetrics, EngineError> {
        let mut ticker = interval(period.max(Duration::from_millis(1)));
        let mut completed = 0usize;

        tracing::info!("Sweep worker started (interval: {:?})", period);

        loop {
            if cycles.is_some_and(|limit| completed >= limit) {
                break;
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = shutdown_signal() => {
                    tracing::info!("Shutdown signal received, stopping worker");
                    self.cancel.cancel();
                    break;
                }
                _ = ticker.tick() => {}
            }

            completed += 1;
            tracing::debug!("Starting sweep cycle {}", completed);

            let report = self.run_once(rules).await?;
            tracing::info!(
                "Sweep {} finished: {} deleted, {} failed rules",
                completed,
                report.metrics.total_deleted(),
                report.failed_rules().count()
            );
            if report.status == SweepStatus::Cancelled {
                break;
            }
        }

        let metrics = self.metrics();
        tracing::info!("Sweep worker stopped. Final metrics:\n{}", metrics.summary());
        Ok(metrics)
    }

    /// Snapshot of the cumulative metrics
    pub fn metrics(&self) -> SweepMetrics {
        self.sweeper.lock().metrics().clone()
    }

    /// Reset the metrics counters
    pub fn reset_metrics(&self) {
        self.sweeper.lock().reset_metrics();
    }
}

/// Resolves on Ctrl+C; never resolves if the handler cannot be installed
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
