//! Progress reporting for frame collection.
//!
//! This module provides [`ProgressCallback`] for monitoring a collection run
//! and [`ProgressInfo`], the snapshot it receives after each frame settles.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use filmstrip::{CollectOptions, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{:.1}% ({} decoded)", info.percentage, info.decoded);
//!     }
//! }
//!
//! let options = CollectOptions::new().with_progress(Arc::new(PrintProgress));
//! ```

use std::time::{Duration, Instant};

/// A snapshot of collection progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Requests that have reported back, successful or not.
    pub settled: usize,
    /// Requests that produced an image so far.
    pub decoded: usize,
    /// Requests issued in this run.
    pub total: usize,
    /// Completion percentage (0.0 – 100.0).
    pub percentage: f32,
    /// Wall-clock time since the requests were issued.
    pub elapsed: Duration,
    /// Time the decoder settled on for the frame that just reported.
    pub current_timestamp: Option<f64>,
}

/// Trait for receiving progress updates while frames are collected.
///
/// Implementations must be [`Send`] and [`Sync`] because the callback runs
/// on whichever decoder thread delivered the frame.
///
/// Callbacks are never invoked while the collector holds its state lock, so
/// they may block briefly, but they cannot stop the run. Use
/// [`FrameCollector::cancel`](crate::FrameCollector::cancel) for that.
pub trait ProgressCallback: Send + Sync {
    /// Called once per settled request.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. This is the default.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Builds [`ProgressInfo`] values for one collection run.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ProgressTracker {
    total: usize,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            total,
            start_time: Instant::now(),
        }
    }

    pub(crate) fn snapshot(
        &self,
        settled: usize,
        decoded: usize,
        timestamp: Option<f64>,
    ) -> ProgressInfo {
        let percentage = if self.total > 0 {
            (settled as f32 / self.total as f32) * 100.0
        } else {
            100.0
        };

        ProgressInfo {
            settled,
            decoded,
            total: self.total,
            percentage,
            elapsed: self.start_time.elapsed(),
            current_timestamp: timestamp,
        }
    }
}
