//! The frame decoder contract.
//!
//! [`FrameCollector`](crate::FrameCollector) never decodes anything itself.
//! It hands a batch of timestamps to a [`FrameDecoder`] and reacts to one
//! [`FrameReport`] per timestamp, delivered on whatever thread the decoder
//! likes. [`FfmpegFrameDecoder`](crate::FfmpegFrameDecoder) is the bundled
//! implementation; tests and embedders can supply their own.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use image::DynamicImage;

use crate::configuration::DecodeOptions;
use crate::error::FilmstripError;

/// How a single timestamp request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    /// A frame was decoded.
    Succeeded,
    /// No frame could be produced for this time.
    Failed,
    /// The request was abandoned by [`FrameDecoder::cancel_all`].
    Cancelled,
}

/// The decoder's answer for one requested timestamp.
#[derive(Clone)]
pub struct FrameReport {
    /// The time that was asked for, in seconds.
    pub requested_time: f64,
    /// The time the decoder actually settled on, in seconds.
    ///
    /// May differ from `requested_time` within the configured tolerances.
    pub actual_time: f64,
    /// The decoded frame. Only present when `status` is `Succeeded`.
    pub image: Option<DynamicImage>,
    /// Outcome of the request.
    pub status: ReportStatus,
}

impl FrameReport {
    /// A successful report.
    pub fn succeeded(requested_time: f64, actual_time: f64, image: DynamicImage) -> Self {
        Self {
            requested_time,
            actual_time,
            image: Some(image),
            status: ReportStatus::Succeeded,
        }
    }

    /// A report for a request that produced no frame.
    pub fn failed(requested_time: f64) -> Self {
        Self {
            requested_time,
            actual_time: requested_time,
            image: None,
            status: ReportStatus::Failed,
        }
    }

    /// A report for a request dropped by cancellation.
    pub fn cancelled(requested_time: f64) -> Self {
        Self {
            requested_time,
            actual_time: requested_time,
            image: None,
            status: ReportStatus::Cancelled,
        }
    }

    /// The image, if this report is a success carrying one.
    pub fn into_image(self) -> Option<DynamicImage> {
        match self.status {
            ReportStatus::Succeeded => self.image,
            ReportStatus::Failed | ReportStatus::Cancelled => None,
        }
    }
}

impl Debug for FrameReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FrameReport")
            .field("requested_time", &self.requested_time)
            .field("actual_time", &self.actual_time)
            .field(
                "image",
                &self.image.as_ref().map(|image| (image.width(), image.height())),
            )
            .field("status", &self.status)
            .finish()
    }
}

/// Callback a decoder invokes once per requested timestamp.
pub type FrameHandler = Arc<dyn Fn(FrameReport) + Send + Sync>;

/// An asynchronous, batch-oriented frame source bound to one media asset.
///
/// # Contract
///
/// - [`generate_images`](FrameDecoder::generate_images) returns as soon as
///   the work is scheduled. An `Err` means nothing was scheduled and the
///   handler will never be called.
/// - After an `Ok`, the handler is called **exactly once** for every entry
///   in `times`, including cancelled ones, from any thread and in any order.
/// - [`cancel_all`](FrameDecoder::cancel_all) is best-effort: outstanding
///   requests should report [`ReportStatus::Cancelled`] promptly.
pub trait FrameDecoder: Send + Sync + 'static {
    /// Load the asset's duration in seconds.
    ///
    /// May block on I/O. An indefinite duration is returned as a non-finite
    /// value rather than an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the asset cannot be read at all.
    fn load_duration(&self) -> Result<f64, FilmstripError>;

    /// Schedule one decode per entry in `times` and return immediately.
    ///
    /// # Errors
    ///
    /// Returns an error for setup-level failures detected before any
    /// request is scheduled.
    fn generate_images(
        &self,
        times: &[f64],
        options: &DecodeOptions,
        handler: FrameHandler,
    ) -> Result<(), FilmstripError>;

    /// Abandon all outstanding requests.
    fn cancel_all(&self);
}

impl<D: FrameDecoder> FrameDecoder for Arc<D> {
    fn load_duration(&self) -> Result<f64, FilmstripError> {
        (**self).load_duration()
    }

    fn generate_images(
        &self,
        times: &[f64],
        options: &DecodeOptions,
        handler: FrameHandler,
    ) -> Result<(), FilmstripError> {
        (**self).generate_images(times, options, handler)
    }

    fn cancel_all(&self) {
        (**self).cancel_all()
    }
}
