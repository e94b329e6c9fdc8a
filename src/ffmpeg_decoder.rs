//! FFmpeg-backed frame decoder.
//!
//! [`FfmpegFrameDecoder`] implements [`FrameDecoder`] for a media file on
//! disk (or any URL FFmpeg can open). Scheduling a batch does no I/O: the
//! file is probed on the [`rayon`] thread pool, then each requested
//! timestamp becomes an independent task there. Every task opens its own
//! demuxer and decoder, so workers share no FFmpeg state. A task seeks to
//! the nearest keyframe before its timestamp, decodes forward to the first
//! frame inside the tolerance window, then rotates and scales it to a
//! preview.
//!
//! Times are relative to the start of the video stream, so files whose
//! first frame is not at zero (MPEG-TS, edit lists) line up with the plan.
//! A file that cannot be probed reports every timestamp as failed.
//!
//! # Example
//!
//! ```no_run
//! use filmstrip::{CollectOptions, FfmpegFrameDecoder, FilmstripError, FrameCollector};
//!
//! # async fn example() -> Result<(), FilmstripError> {
//! let collector = FrameCollector::new(FfmpegFrameDecoder::new("input.mp4"));
//! let frames = collector.generate(None, &CollectOptions::new()).await?;
//! for (index, frame) in frames.iter().enumerate() {
//!     frame.save(format!("thumb_{index:02}.png"))?;
//! }
//! # Ok(())
//! # }
//! ```

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use ffmpeg_next::{
    codec::{Parameters, context::Context as CodecContext},
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use ffmpeg_sys_next::AVPacketSideDataType;
use image::{DynamicImage, RgbImage};
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::configuration::DecodeOptions;
use crate::conversion::{
    frame_to_buffer, pts_to_seconds, seconds_to_seek_timestamp, stream_start_seconds,
};
use crate::decoder::{FrameDecoder, FrameHandler, FrameReport};
use crate::error::FilmstripError;

/// A [`FrameDecoder`] that extracts preview frames with FFmpeg.
///
/// Construction is free; the file is opened when the duration is loaded,
/// once per batch to probe it, and again by every decode task.
#[derive(Debug)]
pub struct FfmpegFrameDecoder {
    path: PathBuf,
    /// Bumped by [`cancel_all`](FrameDecoder::cancel_all). Tasks compare it
    /// with the value captured when their batch was scheduled.
    cancel_epoch: Arc<AtomicU64>,
}

impl FfmpegFrameDecoder {
    /// Create a decoder for the media at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            cancel_epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The media path this decoder reads.
    pub fn path(&self) -> &Path {
        &self.path
    }

}

impl FrameDecoder for FfmpegFrameDecoder {
    fn load_duration(&self) -> Result<f64, FilmstripError> {
        let input = open_input(&self.path)?;

        let container_microseconds = input.duration();
        if container_microseconds > 0 {
            return Ok(Duration::from_micros(container_microseconds as u64).as_secs_f64());
        }

        // Some containers only record the duration on the stream.
        if let Some(stream) = input.streams().best(Type::Video) {
            if stream.duration() > 0 {
                return Ok(pts_to_seconds(stream.duration(), stream.time_base()));
            }
        }

        log::debug!("No duration recorded for {}", self.path.display());
        Ok(f64::NAN)
    }

    fn generate_images(
        &self,
        times: &[f64],
        options: &DecodeOptions,
        handler: FrameHandler,
    ) -> Result<(), FilmstripError> {
        options.validate()?;
        let path = self.path.clone();
        let epoch = self.cancel_epoch.load(Ordering::Acquire);
        let cancel_epoch = Arc::clone(&self.cancel_epoch);
        let options = options.clone();
        let times = times.to_vec();

        log::debug!(
            "Scheduling {} frame requests for {}",
            times.len(),
            path.display()
        );

        // Opening the input blocks, so the probe runs on the pool as well.
        rayon::spawn(move || {
            let source = match VideoSource::probe(&path) {
                Ok(source) => source,
                Err(error) => {
                    log::warn!("Failed to probe {}: {error}", path.display());
                    for time in times {
                        (*handler)(FrameReport::failed(time));
                    }
                    return;
                }
            };

            times.into_par_iter().for_each(|time| {
                let report = if cancel_epoch.load(Ordering::Acquire) != epoch {
                    FrameReport::cancelled(time)
                } else {
                    match source.decode_at(time, &options) {
                        Ok((actual_time, image)) => {
                            FrameReport::succeeded(time, actual_time, image)
                        }
                        Err(error) => {
                            log::debug!("No frame at {time:.3}s: {error}");
                            FrameReport::failed(time)
                        }
                    }
                };
                (*handler)(report);
            });
        });

        Ok(())
    }

    fn cancel_all(&self) {
        self.cancel_epoch.fetch_add(1, Ordering::AcqRel);
    }
}

fn open_input(path: &Path) -> Result<Input, FilmstripError> {
    ffmpeg_next::init().map_err(|error| FilmstripError::FileOpen {
        path: path.to_path_buf(),
        reason: format!("FFmpeg initialisation failed: {error}"),
    })?;

    ffmpeg_next::format::input(path).map_err(|error| FilmstripError::FileOpen {
        path: path.to_path_buf(),
        reason: error.to_string(),
    })
}

/// Everything a decode task needs to find its stream again.
#[derive(Debug)]
struct VideoSource {
    path: PathBuf,
    stream_index: usize,
    orientation: Orientation,
    /// Presentation time of the stream's first frame, in seconds.
    /// Requested and reported times are relative to it.
    start_offset: f64,
}

impl VideoSource {
    /// Find the stream every task will decode.
    fn probe(path: &Path) -> Result<Self, FilmstripError> {
        let input = open_input(path)?;
        let stream = input
            .streams()
            .best(Type::Video)
            .ok_or(FilmstripError::NoVideoStream)?;
        let parameters = stream.parameters();
        let orientation = Orientation::from_parameters(&parameters);
        let start_offset = stream_start_seconds(stream.start_time(), stream.time_base());

        log::debug!(
            "Probed {}: video stream {} ({:?}, starts at {:.3}s)",
            path.display(),
            stream.index(),
            orientation,
            start_offset
        );

        Ok(Self {
            path: path.to_path_buf(),
            stream_index: stream.index(),
            orientation,
            start_offset,
        })
    }

    /// Decode the frame shown at `time`, returning the time it starts at.
    fn decode_at(
        &self,
        time: f64,
        options: &DecodeOptions,
    ) -> Result<(f64, DynamicImage), FilmstripError> {
        let mut input = open_input(&self.path)?;
        let stream = input
            .stream(self.stream_index)
            .ok_or(FilmstripError::NoVideoStream)?;
        let time_base = stream.time_base();
        let decoder_context = CodecContext::from_parameters(stream.parameters())?;
        let mut decoder = decoder_context.decoder().video()?;

        let seek_target = seconds_to_seek_timestamp(time + self.start_offset);
        input.seek(seek_target, ..seek_target)?;

        let mut window = FrameWindow::new(
            time,
            options.tolerance_before.as_secs_f64(),
            options.tolerance_after.as_secs_f64(),
        );
        let mut decoded_frame = VideoFrame::empty();

        for (stream, packet) in input.packets() {
            if stream.index() != self.stream_index {
                continue;
            }

            decoder.send_packet(&packet)?;
            while decoder.receive_frame(&mut decoded_frame).is_ok() {
                let start = frame_start(&decoded_frame, time_base) - self.start_offset;
                if let Some((actual_time, frame)) = window.offer(start, &decoded_frame) {
                    return self.to_preview(actual_time, &frame, options);
                }
            }
        }

        decoder.send_eof()?;
        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            let start = frame_start(&decoded_frame, time_base) - self.start_offset;
            if let Some((actual_time, frame)) = window.offer(start, &decoded_frame) {
                return self.to_preview(actual_time, &frame, options);
            }
        }

        // The stream ended inside the window: the last frame is still on screen.
        match window.finish() {
            Some((actual_time, frame)) => self.to_preview(actual_time, &frame, options),
            None => Err(FilmstripError::VideoDecodeError(format!(
                "no frame decoded near {time:.3}s"
            ))),
        }
    }

    /// Scale, convert and orient a decoded frame.
    fn to_preview(
        &self,
        actual_time: f64,
        frame: &VideoFrame,
        options: &DecodeOptions,
    ) -> Result<(f64, DynamicImage), FilmstripError> {
        let orientation = if options.apply_preferred_transform {
            self.orientation
        } else {
            Orientation::Upright
        };

        let (source_width, source_height) = (frame.width(), frame.height());
        let (target_width, target_height) = if orientation.swaps_dimensions() {
            let (width, height) = options.fit(source_height, source_width);
            (height, width)
        } else {
            options.fit(source_width, source_height)
        };

        let mut scaler = ScalingContext::get(
            frame.format(),
            source_width,
            source_height,
            Pixel::RGB24,
            target_width,
            target_height,
            ScalingFlags::BILINEAR,
        )?;
        let mut rgb_frame = VideoFrame::empty();
        scaler.run(frame, &mut rgb_frame)?;

        let buffer = frame_to_buffer(&rgb_frame, target_width, target_height, 3);
        let image = RgbImage::from_raw(target_width, target_height, buffer).ok_or_else(|| {
            FilmstripError::VideoDecodeError(
                "Failed to create image from decoded frame data".to_string(),
            )
        })?;

        Ok((actual_time, orientation.apply(DynamicImage::ImageRgb8(image))))
    }
}

fn frame_start(frame: &VideoFrame, time_base: ffmpeg_next::Rational) -> f64 {
    let pts = frame.timestamp().or_else(|| frame.pts()).unwrap_or(0);
    pts_to_seconds(pts, time_base)
}

/// Chooses the frame for one requested time as frames decode in order.
struct FrameWindow {
    requested: f64,
    earliest: f64,
    latest: f64,
    /// Most recent frame that started before the window.
    previous: Option<VideoFrame>,
}

impl FrameWindow {
    fn new(requested: f64, before: f64, after: f64) -> Self {
        Self {
            requested,
            earliest: requested - before,
            latest: requested + after,
            previous: None,
        }
    }

    /// Consider a decoded frame starting at `start`.
    ///
    /// Returns the chosen frame and the time to report for it once a
    /// decision is possible.
    fn offer(&mut self, start: f64, frame: &VideoFrame) -> Option<(f64, VideoFrame)> {
        if start < self.earliest {
            self.previous = Some(frame.clone());
            return None;
        }
        if start <= self.latest {
            return Some((start, frame.clone()));
        }
        // The next frame starts past the window, so the previous one is the
        // frame on screen at the requested time.
        match self.previous.take() {
            Some(previous) => Some((self.requested, previous)),
            None => Some((start, frame.clone())),
        }
    }

    fn finish(self) -> Option<(f64, VideoFrame)> {
        let requested = self.requested;
        self.previous.map(|frame| (requested, frame))
    }
}

/// Display rotation recorded in the stream, as a clockwise correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Orientation {
    Upright,
    Clockwise90,
    Rotate180,
    Clockwise270,
}

impl Orientation {
    fn from_parameters(parameters: &Parameters) -> Self {
        // SAFETY: the parameters outlive this call, and the side-data entry
        // is only read when it is large enough to hold a 3x3 i32 matrix.
        let degrees = unsafe {
            let codec_parameters = parameters.as_ptr();
            let side_data = ffmpeg_sys_next::av_packet_side_data_get(
                (*codec_parameters).coded_side_data,
                (*codec_parameters).nb_coded_side_data,
                AVPacketSideDataType::AV_PKT_DATA_DISPLAYMATRIX,
            );
            if side_data.is_null() || (*side_data).size < 9 * size_of::<i32>() {
                return Orientation::Upright;
            }
            ffmpeg_sys_next::av_display_rotation_get((*side_data).data as *const i32)
        };
        Self::from_rotation(degrees)
    }

    /// Map a counter-clockwise display rotation to the correction to apply.
    fn from_rotation(degrees: f64) -> Self {
        if !degrees.is_finite() {
            return Orientation::Upright;
        }
        let theta = -degrees.round();
        let theta = theta - 360.0 * (theta / 360.0 + 0.9 / 360.0).floor();
        match theta.round() as i64 {
            90 => Orientation::Clockwise90,
            180 => Orientation::Rotate180,
            270 => Orientation::Clockwise270,
            _ => Orientation::Upright,
        }
    }

    fn swaps_dimensions(self) -> bool {
        matches!(self, Orientation::Clockwise90 | Orientation::Clockwise270)
    }

    fn apply(self, image: DynamicImage) -> DynamicImage {
        match self {
            Orientation::Upright => image,
            Orientation::Clockwise90 => image.rotate90(),
            Orientation::Rotate180 => image.rotate180(),
            Orientation::Clockwise270 => image.rotate270(),
        }
    }
}
