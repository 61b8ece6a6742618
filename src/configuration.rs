//! Extraction settings.
//!
//! [`ExtractOptions`] is a builder that carries the worker count, JPEG
//! quality, and progress callback into an [`Extractor`](crate::Extractor).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use framesnap::{ExtractOptions, ProgressCallback, ProgressInfo};
//!
//! struct LogProgress;
//! impl ProgressCallback for LogProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{} / {} frames", info.current, info.total);
//!     }
//! }
//!
//! let options = ExtractOptions::new()
//!     .with_threads(8)
//!     .with_quality(90)
//!     .with_progress(Arc::new(LogProgress));
//! assert!(options.validate().is_ok());
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
    time::Duration,
};

use crate::{
    error::FramesnapError,
    progress::{DEFAULT_REPORT_INTERVAL, NoOpProgress, ProgressCallback},
    writer::DEFAULT_JPEG_QUALITY,
};

/// Worker count used when none is configured.
pub const DEFAULT_THREADS: usize = 4;

/// Settings for one extraction run.
#[derive(Clone)]
pub struct ExtractOptions {
    pub(crate) threads: usize,
    pub(crate) quality: u8,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) report_interval: Duration,
}

impl Debug for ExtractOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExtractOptions")
            .field("threads", &self.threads)
            .field("quality", &self.quality)
            .field("report_interval", &self.report_interval)
            .finish_non_exhaustive()
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractOptions {
    /// Defaults: 4 workers, JPEG quality 95, no progress callback, 100 ms
    /// polling interval.
    pub fn new() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            quality: DEFAULT_JPEG_QUALITY,
            progress: Arc::new(NoOpProgress),
            report_interval: DEFAULT_REPORT_INTERVAL,
        }
    }

    /// Set the number of worker threads. Zero is rejected by
    /// [`validate`](ExtractOptions::validate).
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set the JPEG quality (1–100).
    #[must_use]
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Set how often the progress callback fires.
    #[must_use]
    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// JPEG quality.
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Check the settings before anything touches the filesystem.
    ///
    /// # Errors
    ///
    /// [`FramesnapError::InvalidThreadCount`] for zero workers,
    /// [`FramesnapError::InvalidQuality`] for a quality outside `1..=100`.
    pub fn validate(&self) -> Result<(), FramesnapError> {
        if self.threads == 0 {
            return Err(FramesnapError::InvalidThreadCount { threads: 0 });
        }
        if !(1..=100).contains(&self.quality) {
            return Err(FramesnapError::InvalidQuality {
                quality: self.quality,
            });
        }
        Ok(())
    }
}

/// Convert a signed, user-supplied worker count into a validated one.
///
/// ```
/// use framesnap::thread_count_from_arg;
///
/// assert_eq!(thread_count_from_arg(8).unwrap(), 8);
/// assert!(thread_count_from_arg(0).unwrap_err().is_config_error());
/// assert!(thread_count_from_arg(-1).unwrap_err().is_config_error());
/// ```
pub fn thread_count_from_arg(threads: i64) -> Result<usize, FramesnapError> {
    usize::try_from(threads)
        .ok()
        .filter(|&count| count > 0)
        .ok_or(FramesnapError::InvalidThreadCount { threads })
}
