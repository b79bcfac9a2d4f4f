//! Per-rule time budget enforcement
//!
//! A [`Watchdog`] owns a small timing thread that compares elapsed time with
//! the budget every check interval and latches an expiry flag once the budget
//! is spent. The traversal polls [`Watchdog::is_expired`] at its checkpoints,
//! so a rule may overshoot its budget by up to one interval.

use crate::EngineError;
use parking_lot::Mutex;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct WatchState {
    started: Instant,
    expired: bool,
}

/// Resettable expiry flag bound to a duration
///
/// # Examples
///
/// ```
/// use mrclean_engine::Watchdog;
/// use std::time::Duration;
///
/// # fn main() -> Result<(), mrclean_engine::EngineError> {
/// let mut watchdog = Watchdog::new(Duration::from_secs(60), Duration::from_millis(100));
/// watchdog.start()?;
/// assert!(!watchdog.is_expired());
/// watchdog.reset();
/// watchdog.stop();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Watchdog {
    limit: Duration,
    interval: Duration,
    state: Arc<Mutex<WatchState>>,
    stop_tx: Option<Sender<()>>,
    ticker: Option<JoinHandle<()>>,
}

impl Watchdog {
    /// Create a stopped watchdog
    pub fn new(limit: Duration, interval: Duration) -> Self {
        Self {
            limit,
            interval,
            state: Arc::new(Mutex::new(WatchState {
                started: Instant::now(),
                expired: false,
            })),
            stop_tx: None,
            ticker: None,
        }
    }

    /// Configured budget
    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// Start the timing thread; the budget is measured from this call
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.ticker.is_some() {
            return Ok(());
        }

        {
            let mut state = self.state.lock();
            state.started = Instant::now();
            state.expired = false;
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let state = Arc::clone(&self.state);
        let limit = self.limit;
        let interval = self.interval;

        let ticker = thread::Builder::new()
            .name("mrclean-watchdog".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let mut state = state.lock();
                        if state.started.elapsed() >= limit {
                            state.expired = true;
                            break;
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .map_err(EngineError::Watchdog)?;

        self.stop_tx = Some(stop_tx);
        self.ticker = Some(ticker);
        Ok(())
    }

    /// Whether the budget has been spent. Once set, the flag stays set.
    pub fn is_expired(&self) -> bool {
        self.state.lock().expired
    }

    /// Rebase the start time to now
    pub fn reset(&self) {
        self.state.lock().started = Instant::now();
    }

    /// Time since start or the last reset
    pub fn elapsed(&self) -> Duration {
        self.state.lock().started.elapsed()
    }

    /// Stop the timing thread and wait for it to exit
    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(ticker) = self.ticker.take() {
            if ticker.join().is_err() {
                tracing::debug!("Watchdog thread panicked");
            }
        }
    }

    /// Whether the timing thread is still running
    pub fn is_running(&self) -> bool {
        self.ticker.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.stop();
    }
}
