//! Progress reporting.
//!
//! Implement [`ProgressCallback`] and attach it with
//! [`ExtractOptions::with_progress`](crate::ExtractOptions::with_progress) to
//! observe an extraction. Callbacks only observe; there is no way to stop a
//! running extraction from one.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framepick::{ExtractOptions, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("{pct:.1}% ({} frames)", info.current);
//!         }
//!     }
//! }
//!
//! let options = ExtractOptions::new().with_progress(Arc::new(PrintProgress));
//! ```

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use crate::time::Timestamp;

/// A snapshot of extraction progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Frames emitted so far.
    pub current: u64,
    /// Frames expected in total, when the range has a bounded end.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time since the extraction loop started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// Output index of the frame just emitted.
    pub frame_index: Option<u64>,
    /// Timestamp of the frame just emitted.
    pub timestamp: Option<Timestamp>,
}

/// Receives progress updates during extraction.
pub trait ProgressCallback: Send + Sync {
    /// Called every `batch_size` emitted frames and once at the end.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all notifications. The default.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Tracks timing and fires the callback at the configured cadence.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: Option<u64>,
    current: u64,
    batch_size: u64,
    start_time: Instant,
    since_last_report: u64,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        total: Option<u64>,
        batch_size: u64,
    ) -> Self {
        Self {
            callback,
            total,
            current: 0,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            since_last_report: 0,
        }
    }

    /// Record one emitted frame.
    pub(crate) fn advance(&mut self, frame_index: u64, timestamp: Timestamp) {
        self.current += 1;
        self.since_last_report += 1;

        if self.since_last_report >= self.batch_size {
            self.report(Some(frame_index), Some(timestamp));
            self.since_last_report = 0;
        }
    }

    /// Unconditionally emit a final report.
    pub(crate) fn finish(&mut self) {
        self.report(None, None);
    }

    fn report(&self, frame_index: Option<u64>, timestamp: Option<Timestamp>) {
        let elapsed = self.start_time.elapsed();

        let percentage = self
            .total
            .filter(|&total| total > 0)
            .map(|total| (self.current as f32 / total as f32 * 100.0).min(100.0));

        let estimated_remaining = if self.current > 0 {
            self.total.map(|total| {
                let remaining = total.saturating_sub(self.current);
                elapsed.mul_f64(remaining as f64 / self.current as f64)
            })
        } else {
            None
        };

        self.callback.on_progress(&ProgressInfo {
            current: self.current,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            frame_index,
            timestamp,
        });
    }
}
