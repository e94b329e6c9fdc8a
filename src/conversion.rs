//! Internal conversion helpers.
//!
//! Pixel-buffer packing and timestamp rescaling shared by the FFmpeg
//! decoder.

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Copy pixel data from an FFmpeg video frame into a tightly-packed buffer.
///
/// FFmpeg frames frequently carry per-row padding (stride > width ×
/// `bytes_per_pixel`). The padding is stripped so the result can be passed
/// straight to [`image::RgbImage::from_raw`].
pub(crate) fn frame_to_buffer(
    video_frame: &VideoFrame,
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_length = (width as usize) * bytes_per_pixel;
    let data = video_frame.data(0);

    if stride == row_length {
        data[..row_length * (height as usize)].to_vec()
    } else {
        data.chunks(stride)
            .take(height as usize)
            .flat_map(|row| &row[..row_length])
            .copied()
            .collect()
    }
}

/// Rescale a PTS value from the stream time base to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// A stream's first presentation time in seconds.
///
/// Streams without a recorded start (`AV_NOPTS_VALUE`) start at zero. The
/// result may be negative for files with an edit list.
pub(crate) fn stream_start_seconds(start_time: i64, time_base: Rational) -> f64 {
    if start_time == ffmpeg_sys_next::AV_NOPTS_VALUE || time_base.denominator() == 0 {
        return 0.0;
    }
    pts_to_seconds(start_time, time_base)
}

/// Convert seconds to a container-level seek target.
///
/// `Input::seek` works in AV_TIME_BASE units (microseconds). Negative input
/// seeks to the start.
pub(crate) fn seconds_to_seek_timestamp(seconds: f64) -> i64 {
    (seconds.max(0.0) * 1_000_000.0) as i64
}

#[cfg(test)]
mod tests {
    use ffmpeg_next::Rational;

    use super::{seconds_to_seek_timestamp, stream_start_seconds};

    #[test]
    fn stream_start_uses_time_base() {
        // MPEG-TS streams commonly start 1.4 s in on a 90 kHz clock.
        assert_eq!(stream_start_seconds(126_000, Rational::new(1, 90_000)), 1.4);
        assert_eq!(stream_start_seconds(0, Rational::new(1, 90_000)), 0.0);
        assert_eq!(stream_start_seconds(-512, Rational::new(1, 12_800)), -0.04);
    }

    #[test]
    fn missing_stream_start_is_zero() {
        let time_base = Rational::new(1, 90_000);
        assert_eq!(stream_start_seconds(ffmpeg_sys_next::AV_NOPTS_VALUE, time_base), 0.0);
    }

    #[test]
    fn seek_target_is_microseconds_from_zero() {
        assert_eq!(seconds_to_seek_timestamp(2.5), 2_500_000);
        assert_eq!(seconds_to_seek_timestamp(-1.0), 0);
    }
}
