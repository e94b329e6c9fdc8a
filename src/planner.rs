//! Request planning.
//!
//! A [`RequestPlan`] is the ordered list of timestamps a strip is sampled
//! at. Planning is pure: the same duration always produces the same plan,
//! and an unusable duration produces an empty plan rather than an error.
//!
//! # Example
//!
//! ```
//! use filmstrip::RequestPlan;
//!
//! let plan = RequestPlan::for_duration(20.0);
//! assert_eq!(plan.len(), 10);
//! assert_eq!(plan.interval(), 2.0);
//! assert_eq!(plan.timestamps()[9], 18.0);
//!
//! // Indefinite durations yield no requests at all.
//! assert!(RequestPlan::for_duration(f64::NAN).is_empty());
//! ```

/// Fewest frames a non-empty plan requests.
pub const MIN_FRAME_COUNT: usize = 10;

/// Most frames any plan requests.
pub const MAX_FRAME_COUNT: usize = 60;

/// Seconds of content per sampled frame before clamping.
const SECONDS_PER_FRAME: f64 = 2.0;

/// An ordered, evenly-spaced set of timestamps to decode.
///
/// Timestamps are in seconds, start at zero, and stay strictly below the
/// source duration.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestPlan {
    duration: f64,
    interval: f64,
    timestamps: Vec<f64>,
}

impl RequestPlan {
    /// Plan roughly one frame per two seconds of content, clamped to
    /// [`MIN_FRAME_COUNT`]..=[`MAX_FRAME_COUNT`].
    ///
    /// Returns an empty plan when `duration` is not finite, not positive, or
    /// too small to space frames apart.
    pub fn for_duration(duration: f64) -> Self {
        if !is_usable(duration) {
            return Self::empty();
        }
        Self::build(duration, frame_count_for_duration(duration))
    }

    /// Plan an explicit number of frames.
    ///
    /// `count` is clamped to [`MIN_FRAME_COUNT`]..=[`MAX_FRAME_COUNT`], so a
    /// caller can change the sampling density without exceeding the limits.
    pub fn with_count(duration: f64, count: usize) -> Self {
        if !is_usable(duration) {
            return Self::empty();
        }
        Self::build(duration, clamp_count(count))
    }

    /// A plan with no timestamps.
    pub fn empty() -> Self {
        Self {
            duration: 0.0,
            interval: 0.0,
            timestamps: Vec::new(),
        }
    }

    fn build(duration: f64, count: usize) -> Self {
        let interval = duration / count as f64;
        let timestamps = (0..count).map(|index| index as f64 * interval).collect();
        Self {
            duration,
            interval,
            timestamps,
        }
    }

    /// The requested timestamps in seconds, in ordinal order.
    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    /// Spacing between consecutive timestamps in seconds.
    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// The duration this plan was derived from (zero for an empty plan).
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Number of requested timestamps.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// `true` when nothing should be requested.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Recover the ordinal index a decoded time belongs to.
    ///
    /// Decoders may settle on a time near the requested one, so this rounds
    /// `time / interval` to the nearest index and clamps it into the plan.
    /// Two nearby times can map to the same index.
    pub fn index_for(&self, time: f64) -> usize {
        let last = self.timestamps.len().saturating_sub(1);
        if !(self.interval > 0.0) || !time.is_finite() {
            return 0;
        }
        let raw = (time / self.interval).round();
        if raw <= 0.0 {
            0
        } else {
            (raw as usize).min(last)
        }
    }
}

/// Plan frames for `duration` seconds using the default sampling density.
///
/// Shorthand for [`RequestPlan::for_duration`].
pub fn plan(duration: f64) -> RequestPlan {
    RequestPlan::for_duration(duration)
}

/// Number of frames the default density requests for `seconds` of content.
///
/// Non-finite or non-positive input yields [`MIN_FRAME_COUNT`]; use
/// [`RequestPlan::for_duration`] when such input should produce no plan.
pub fn frame_count_for_duration(seconds: f64) -> usize {
    let raw = seconds / SECONDS_PER_FRAME;
    if !raw.is_finite() || raw <= 0.0 {
        return MIN_FRAME_COUNT;
    }
    // Float-to-int casts saturate, so huge durations land on the ceiling.
    clamp_count(raw.trunc() as usize)
}

fn clamp_count(count: usize) -> usize {
    count.clamp(MIN_FRAME_COUNT, MAX_FRAME_COUNT)
}

/// Finite, positive, and large enough that even the densest plan has a
/// non-zero interval.
fn is_usable(duration: f64) -> bool {
    duration.is_finite() && duration / MAX_FRAME_COUNT as f64 > 0.0
}
