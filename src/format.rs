//! Display formatting for playback times.
//!
//! Three pure formatters for timeline labels. None of them fail: a negative,
//! NaN, infinite, or absurdly large input (or `None` for the
//! `Option<Duration>` variants) produces a fixed placeholder instead.
//!
//! ```
//! use filmstrip::format;
//!
//! assert_eq!(format::compact(83.9), "1:23");
//! assert_eq!(format::precise(59.997), "1:00.00");
//! assert_eq!(format::short(3723.0), "1h 2m 3s");
//! assert_eq!(format::compact(f64::NAN), format::COMPACT_PLACEHOLDER);
//! ```

use std::time::Duration;

/// Returned by [`compact`] for unusable input.
pub const COMPACT_PLACEHOLDER: &str = "--:--";

/// Returned by [`precise`] for unusable input.
pub const PRECISE_PLACEHOLDER: &str = "--:--.--";

/// Returned by [`short`] for unusable input.
pub const SHORT_PLACEHOLDER: &str = "—";

/// Whole seconds must fit in a `u64`; larger values would saturate and
/// the formats would disagree.
const MAX_SECONDS: f64 = u64::MAX as f64;

fn is_valid(seconds: f64) -> bool {
    seconds.is_finite() && (0.0..MAX_SECONDS).contains(&seconds)
}

/// Split whole seconds into hours, minutes and seconds.
fn split(seconds: f64) -> (u64, u64, u64) {
    let whole = seconds.trunc() as u64;
    (whole / 3600, (whole % 3600) / 60, whole % 60)
}

/// `"H:MM:SS"` when there are hours, otherwise `"M:SS"`.
///
/// Fractional seconds are truncated.
pub fn compact(seconds: f64) -> String {
    if !is_valid(seconds) {
        return COMPACT_PLACEHOLDER.to_string();
    }

    let (hours, minutes, seconds) = split(seconds);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// `"H:MM:SS.ff"` when there are hours, otherwise `"M:SS.ff"`.
///
/// Seconds are rounded to hundredths. When rounding reaches a full minute
/// the carry moves into the minutes (and from there into the hours), so
/// 59.997 s renders as `"1:00.00"` rather than `"0:60.00"`.
pub fn precise(seconds: f64) -> String {
    if !is_valid(seconds) {
        return PRECISE_PLACEHOLDER.to_string();
    }

    let (mut hours, mut minutes, _) = split(seconds);
    let mut fraction = ((seconds % 60.0) * 100.0).round() / 100.0;

    if fraction >= 60.0 {
        fraction -= 60.0;
        minutes += 1;
    }
    if minutes >= 60 {
        minutes -= 60;
        hours += 1;
    }

    if hours > 0 {
        format!("{hours}:{minutes:02}:{fraction:05.2}")
    } else {
        format!("{minutes}:{fraction:05.2}")
    }
}

/// A terse human-readable length such as `"1h 2m 3s"`, `"4m 5s"` or `"6s"`.
///
/// Leading zero units are omitted; once a larger unit is shown every smaller
/// one follows.
pub fn short(seconds: f64) -> String {
    if !is_valid(seconds) {
        return SHORT_PLACEHOLDER.to_string();
    }

    let (hours, minutes, seconds) = split(seconds);
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// [`compact`] for an optional duration; `None` means indefinite.
pub fn compact_duration(duration: Option<Duration>) -> String {
    compact(duration.map_or(f64::NAN, |d| d.as_secs_f64()))
}

/// [`precise`] for an optional duration; `None` means indefinite.
pub fn precise_duration(duration: Option<Duration>) -> String {
    precise(duration.map_or(f64::NAN, |d| d.as_secs_f64()))
}

/// [`short`] for an optional duration; `None` means indefinite.
pub fn short_duration(duration: Option<Duration>) -> String {
    short(duration.map_or(f64::NAN, |d| d.as_secs_f64()))
}
