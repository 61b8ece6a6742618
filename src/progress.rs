//! Progress reporting.
//!
//! Workers bump a shared [`ProgressCounter`] after each saved frame. A
//! [`ProgressReporter`] owns a polling thread that reads the counter at a
//! fixed interval and hands a [`ProgressInfo`] snapshot to a
//! [`ProgressCallback`]. Workers never block on the reporter: the counter is
//! a single atomic and only eventual accuracy of the display is required.
//!
//! # Example
//!
//! ```
//! use std::{sync::Arc, time::Duration};
//!
//! use framesnap::{ProgressCallback, ProgressInfo, ProgressReporter};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{}/{}", info.current, info.total);
//!     }
//! }
//!
//! let reporter = ProgressReporter::start(10, Arc::new(PrintProgress), Duration::from_millis(50));
//! reporter.advance(10);
//! assert_eq!(reporter.stop(), 10);
//! ```

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

/// Default polling interval of a [`ProgressReporter`].
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_millis(100);

/// A snapshot of extraction progress.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressInfo {
    /// Frames saved so far.
    pub current: u64,
    /// Frames expected in total.
    pub total: u64,
    /// Completion percentage (0.0 – 100.0). `None` when `total` is zero.
    pub percentage: Option<f32>,
    /// Wall-clock time since the reporter started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on throughput so far.
    pub estimated_remaining: Option<Duration>,
}

impl ProgressInfo {
    fn snapshot(current: u64, total: u64, elapsed: Duration) -> Self {
        let percentage = (total > 0).then(|| (current as f32 / total as f32) * 100.0);

        let estimated_remaining = (current > 0).then(|| {
            let remaining = total.saturating_sub(current);
            elapsed.mul_f64(remaining as f64 / current as f64)
        });

        Self {
            current,
            total,
            percentage,
            elapsed,
            estimated_remaining,
        }
    }
}

/// Receives progress snapshots from the reporter thread.
///
/// Implementations must be [`Send`] and [`Sync`] because they are called from
/// the polling thread. Callbacks observe the run; they cannot halt it.
pub trait ProgressCallback: Send + Sync {
    /// Called once per polling interval and once more when reporting stops.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Shared tally of completed frames.
///
/// Cloning yields another handle to the same counter.
#[derive(Debug, Clone, Default)]
pub struct ProgressCounter {
    completed: Arc<AtomicU64>,
}

impl ProgressCounter {
    /// Create a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `n` completed frames.
    pub fn advance(&self, n: u64) {
        self.completed.fetch_add(n, Ordering::Relaxed);
    }

    /// Current value.
    pub fn get(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }
}

/// Polls a [`ProgressCounter`] on a background thread.
///
/// Dropping a reporter without calling [`stop`](ProgressReporter::stop)
/// stops and joins the thread.
#[derive(Debug)]
pub struct ProgressReporter {
    counter: ProgressCounter,
    stopped: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressReporter {
    /// Start reporting progress towards `total` frames every `interval`.
    pub fn start(total: u64, callback: Arc<dyn ProgressCallback>, interval: Duration) -> Self {
        let counter = ProgressCounter::new();
        let stopped = Arc::new(AtomicBool::new(false));

        let handle = {
            let counter = counter.clone();
            let stopped = Arc::clone(&stopped);
            let interval = interval.max(Duration::from_millis(1));

            thread::Builder::new()
                .name("framesnap-progress".to_string())
                .spawn(move || {
                    let started = Instant::now();
                    loop {
                        let done = stopped.load(Ordering::Acquire);
                        let info = ProgressInfo::snapshot(counter.get(), total, started.elapsed());
                        callback.on_progress(&info);
                        if done {
                            break;
                        }
                        thread::park_timeout(interval);
                    }
                })
        };

        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(error) => {
                log::warn!("Progress display disabled, could not spawn reporter thread: {error}");
                None
            }
        };

        Self {
            counter,
            stopped,
            handle,
        }
    }

    /// Another handle to the counter this reporter polls.
    pub fn counter(&self) -> ProgressCounter {
        self.counter.clone()
    }

    /// Add `n` completed frames.
    pub fn advance(&self, n: u64) {
        self.counter.advance(n);
    }

    /// Stop polling, emit one final report, and return the final count.
    pub fn stop(mut self) -> u64 {
        self.shutdown();
        self.counter.get()
    }

    fn shutdown(&mut self) {
        self.stopped.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                log::warn!("Progress reporter thread panicked");
            }
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.shutdown();
    }
}
