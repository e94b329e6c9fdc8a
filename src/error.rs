//! Error types for the `filmstrip` crate.
//!
//! This module defines [`FilmstripError`], the unified error type returned by
//! all fallible operations in the crate. Only batch-level problems surface
//! here: a single timestamp that fails to decode is reported to the collector
//! as a failed [`FrameReport`](crate::FrameReport) and simply leaves a gap in
//! the strip.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `filmstrip` operations.
///
/// Returned by planning-independent setup (opening the asset, validating
/// options) and by the collection future when the run cannot complete.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FilmstripError {
    /// The media file could not be opened.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to the decoder.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("Media has no decodable video stream")]
    NoVideoStream,

    /// A preview frame could not be produced at the requested time.
    #[error("Failed to decode preview frame: {0}")]
    VideoDecodeError(String),

    /// Decode or collection options were rejected before any work started.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate during frame conversion or saving.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// The decoder released its frame handler before reporting every
    /// requested timestamp, so the collection can never complete.
    #[error("Decoder abandoned the collection before all frames were reported")]
    CollectionAbandoned,

    /// A background task was cancelled before it produced a result.
    #[error("Background task was cancelled")]
    Cancelled,
}

impl From<FfmpegError> for FilmstripError {
    fn from(error: FfmpegError) -> Self {
        FilmstripError::FfmpegError(error.to_string())
    }
}
