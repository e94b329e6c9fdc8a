//! # filmstrip
//!
//! Extract an evenly-spaced, time-ordered strip of preview frames from a
//! video: the row of thumbnails a trimming timeline shows under the
//! playhead.
//!
//! A strip is built in two steps. A [`RequestPlan`] turns the content
//! duration into a fixed set of timestamps (about one every two seconds,
//! between [`MIN_FRAME_COUNT`] and [`MAX_FRAME_COUNT`] of them). A
//! [`FrameCollector`] then issues every timestamp to a [`FrameDecoder`] at
//! once, gathers the frames as they complete on the decoder's worker
//! threads, and resolves a single future with the frames in plan order.
//! Frames that fail to decode are left out rather than padded.
//!
//! ## Quick Start
//!
//! ```no_run
//! use filmstrip::{CollectOptions, FfmpegFrameDecoder, FrameCollector, FilmstripError};
//!
//! # async fn example() -> Result<(), FilmstripError> {
//! let collector = FrameCollector::new(FfmpegFrameDecoder::new("input.mp4"));
//! let frames = collector.generate(None, &CollectOptions::new()).await?;
//! filmstrip::compose_strip(&frames, 10)?.save("strip.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Planning without decoding
//!
//! ```
//! use filmstrip::RequestPlan;
//!
//! let plan = RequestPlan::for_duration(95.0);
//! assert_eq!(plan.len(), 47);
//! assert!(plan.timestamps().iter().all(|&t| t < 95.0));
//! ```
//!
//! ### Timeline labels
//!
//! ```
//! assert_eq!(filmstrip::format::compact(3723.0), "1:02:03");
//! assert_eq!(filmstrip::format::precise(59.997), "1:00.00");
//! assert_eq!(filmstrip::format::short(125.0), "2m 5s");
//! ```
//!
//! ## Features
//!
//! - **Deterministic planning**: the same duration always yields the same
//!   timestamps; unusable durations yield an empty plan, not an error
//! - **Concurrent collection**: one batch request, reports accepted from
//!   any thread in any order, exactly one resolution per run
//! - **Cancellation**: [`FrameCollector::cancel`] abandons outstanding
//!   decodes; the run still resolves once every request has reported
//! - **Deadlines**: [`CollectOptions::with_timeout`] resolves early with
//!   the frames gathered so far
//! - **Progress**: [`ProgressCallback`] fires once per settled request
//! - **FFmpeg decoding**: [`FfmpegFrameDecoder`] decodes on the rayon pool,
//!   honours display rotation, and scales to fit 160×90 by default
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system for the
//! bundled decoder.

pub mod collector;
pub mod configuration;
mod conversion;
pub mod decoder;
pub mod error;
pub mod ffmpeg;
pub mod ffmpeg_decoder;
pub mod format;
pub mod planner;
pub mod progress;
pub mod strip;

pub use collector::{CollectionFuture, FrameCollector};
pub use configuration::{CollectOptions, DecodeOptions};
pub use decoder::{FrameDecoder, FrameHandler, FrameReport, ReportStatus};
pub use error::FilmstripError;
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use ffmpeg_decoder::FfmpegFrameDecoder;
pub use planner::{MAX_FRAME_COUNT, MIN_FRAME_COUNT, RequestPlan, frame_count_for_duration, plan};
pub use progress::{ProgressCallback, ProgressInfo};
pub use strip::compose_strip;
