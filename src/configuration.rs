//! Decode and collection configuration.
//!
//! [`DecodeOptions`] tells a [`FrameDecoder`](crate::FrameDecoder) how to
//! produce each preview frame. [`CollectOptions`] threads decode settings,
//! an optional deadline, and a progress callback through
//! [`FrameCollector`](crate::FrameCollector) without widening every
//! signature.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use filmstrip::{CollectOptions, DecodeOptions, ProgressCallback, ProgressInfo};
//!
//! struct LogProgress;
//! impl ProgressCallback for LogProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{}/{} settled", info.settled, info.total);
//!     }
//! }
//!
//! let options = CollectOptions::new()
//!     .with_decode(DecodeOptions::new().with_maximum_size(320, 180))
//!     .with_timeout(Duration::from_secs(5))
//!     .with_progress(Arc::new(LogProgress));
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::time::Duration;

use crate::error::FilmstripError;
use crate::progress::{NoOpProgress, ProgressCallback};

/// Default maximum preview width in pixels.
pub const DEFAULT_MAXIMUM_WIDTH: u32 = 160;

/// Default maximum preview height in pixels.
pub const DEFAULT_MAXIMUM_HEIGHT: u32 = 90;

/// Default tolerance after a requested time.
pub const DEFAULT_TOLERANCE_AFTER: Duration = Duration::from_millis(100);

/// Per-frame decode settings handed to the decoder.
///
/// Defaults: orientation correction on, frames fit inside 160×90 with the
/// source aspect ratio preserved, no tolerance before the requested time,
/// and 0.1 s after it so the decoder can settle on a nearby frame.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct DecodeOptions {
    /// Rotate frames according to the stream's display orientation.
    pub apply_preferred_transform: bool,
    /// Largest output width. Frames are scaled down to fit, never up.
    pub maximum_width: u32,
    /// Largest output height.
    pub maximum_height: u32,
    /// How far before the requested time a decoded frame may start.
    pub tolerance_before: Duration,
    /// How far after the requested time a decoded frame may start.
    pub tolerance_after: Duration,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            apply_preferred_transform: true,
            maximum_width: DEFAULT_MAXIMUM_WIDTH,
            maximum_height: DEFAULT_MAXIMUM_HEIGHT,
            tolerance_before: Duration::ZERO,
            tolerance_after: DEFAULT_TOLERANCE_AFTER,
        }
    }
}

impl DecodeOptions {
    /// Create decode options with the preview defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable orientation correction.
    pub fn with_preferred_transform(mut self, apply: bool) -> Self {
        self.apply_preferred_transform = apply;
        self
    }

    /// Set the bounding box frames are scaled to fit inside.
    pub fn with_maximum_size(mut self, width: u32, height: u32) -> Self {
        self.maximum_width = width;
        self.maximum_height = height;
        self
    }

    /// Set the tolerances around each requested time.
    pub fn with_tolerances(mut self, before: Duration, after: Duration) -> Self {
        self.tolerance_before = before;
        self.tolerance_after = after;
        self
    }

    /// Check the options before any decode work is scheduled.
    ///
    /// # Errors
    ///
    /// Returns [`FilmstripError::InvalidOptions`] if either maximum
    /// dimension is zero.
    pub fn validate(&self) -> Result<(), FilmstripError> {
        if self.maximum_width == 0 || self.maximum_height == 0 {
            return Err(FilmstripError::InvalidOptions(format!(
                "maximum size must be non-zero, got {}x{}",
                self.maximum_width, self.maximum_height
            )));
        }
        Ok(())
    }

    /// Compute the output size for a `width`×`height` frame.
    ///
    /// Preserves the aspect ratio and only ever scales down. Dimensions are
    /// rounded to the nearest pixel and never drop below 1.
    pub fn fit(&self, width: u32, height: u32) -> (u32, u32) {
        if width == 0 || height == 0 {
            return (self.maximum_width.max(1), self.maximum_height.max(1));
        }
        let scale = (self.maximum_width as f64 / width as f64)
            .min(self.maximum_height as f64 / height as f64)
            .min(1.0);
        let fitted_width = ((width as f64) * scale).round() as u32;
        let fitted_height = ((height as f64) * scale).round() as u32;
        (fitted_width.max(1), fitted_height.max(1))
    }
}

/// Configuration for a collection run.
///
/// A default-constructed value uses the default [`DecodeOptions`], waits for
/// every frame with no deadline, and reports no progress.
#[derive(Clone)]
#[must_use]
pub struct CollectOptions {
    pub(crate) decode: DecodeOptions,
    pub(crate) timeout: Option<Duration>,
    pub(crate) progress: Arc<dyn ProgressCallback>,
}

impl Debug for CollectOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("CollectOptions")
            .field("decode", &self.decode)
            .field("timeout", &self.timeout)
            .field("has_progress", &true)
            .finish()
    }
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectOptions {
    /// Create collection options with default settings.
    pub fn new() -> Self {
        Self {
            decode: DecodeOptions::default(),
            timeout: None,
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Replace the decode settings.
    pub fn with_decode(mut self, decode: DecodeOptions) -> Self {
        self.decode = decode;
        self
    }

    /// Resolve with whatever has arrived once `timeout` elapses.
    ///
    /// When the deadline passes the collector cancels the decoder and
    /// resolves with the frames gathered so far. Callbacks that arrive
    /// afterwards are ignored.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach a progress callback, fired once per settled frame.
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// The decode settings in use.
    pub fn decode(&self) -> &DecodeOptions {
        &self.decode
    }

    /// The deadline, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
