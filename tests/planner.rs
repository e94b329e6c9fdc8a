//! Request planning tests.

use filmstrip::{MAX_FRAME_COUNT, MIN_FRAME_COUNT, RequestPlan, frame_count_for_duration, plan};

// ── Unusable durations ─────────────────────────────────────────────

#[test]
fn unusable_durations_plan_nothing() {
    for duration in [0.0, -0.0, -1.0, -3600.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let plan = plan(duration);
        assert!(plan.is_empty(), "duration {duration} produced a plan");
        assert_eq!(plan.len(), 0);
    }
}

#[test]
fn subnormal_durations_plan_nothing() {
    // Dividing these by the frame count underflows to a zero interval.
    for duration in [5e-324, 1e-322] {
        assert!(plan(duration).is_empty(), "duration {duration} produced a plan");
        assert!(RequestPlan::with_count(duration, 10).is_empty());
    }
}

#[test]
fn smallest_normal_duration_still_increases() {
    let plan = plan(f64::MIN_POSITIVE);
    assert_eq!(plan.len(), 10);
    assert!(plan.interval() > 0.0);
    assert!(plan.timestamps().windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn unusable_durations_ignore_count_override() {
    assert!(RequestPlan::with_count(0.0, 30).is_empty());
    assert!(RequestPlan::with_count(f64::NAN, 30).is_empty());
}

// ── Frame counts ───────────────────────────────────────────────────

#[test]
fn count_follows_two_second_density_within_limits() {
    let cases = [
        (0.5, 10),
        (19.9, 10),
        (20.0, 10),
        (22.0, 11),
        (23.9, 11),
        (95.0, 47),
        (119.9, 59),
        (120.0, 60),
        (7200.0, 60),
        (f64::MAX, 60),
    ];
    for (duration, expected) in cases {
        assert_eq!(plan(duration).len(), expected, "duration {duration}");
        assert_eq!(frame_count_for_duration(duration), expected, "duration {duration}");
    }
}

#[test]
fn frame_count_defaults_to_minimum_for_invalid_input() {
    assert_eq!(frame_count_for_duration(f64::NAN), MIN_FRAME_COUNT);
    assert_eq!(frame_count_for_duration(-5.0), MIN_FRAME_COUNT);
}

#[test]
fn count_override_is_clamped() {
    assert_eq!(RequestPlan::with_count(100.0, 0).len(), MIN_FRAME_COUNT);
    assert_eq!(RequestPlan::with_count(100.0, 25).len(), 25);
    assert_eq!(RequestPlan::with_count(100.0, 1000).len(), MAX_FRAME_COUNT);
}

// ── Timestamps ─────────────────────────────────────────────────────

#[test]
fn timestamps_start_at_zero_and_stay_below_duration() {
    for duration in [0.01, 1.0, 19.0, 33.3, 95.0, 121.7, 86_400.0] {
        let plan = plan(duration);
        let timestamps = plan.timestamps();

        assert_eq!(timestamps[0], 0.0);
        assert!(*timestamps.last().unwrap() < duration, "duration {duration}");
        assert!(
            timestamps.windows(2).all(|pair| pair[0] < pair[1]),
            "timestamps not increasing for {duration}"
        );
    }
}

#[test]
fn twenty_seconds_samples_every_two() {
    let plan = plan(20.0);

    assert_eq!(plan.len(), 10);
    assert_eq!(plan.interval(), 2.0);
    assert_eq!(plan.duration(), 20.0);
    assert_eq!(
        plan.timestamps(),
        &[0.0, 2.0, 4.0, 6.0, 8.0, 10.0, 12.0, 14.0, 16.0, 18.0]
    );
}

#[test]
fn planning_is_deterministic() {
    assert_eq!(plan(77.7), plan(77.7));
    assert_eq!(RequestPlan::with_count(77.7, 15), RequestPlan::with_count(77.7, 15));
}

// ── Index recovery ─────────────────────────────────────────────────

#[test]
fn index_for_rounds_to_nearest_slot() {
    let plan = plan(20.0);

    assert_eq!(plan.index_for(0.0), 0);
    assert_eq!(plan.index_for(0.9), 0);
    assert_eq!(plan.index_for(1.1), 1);
    assert_eq!(plan.index_for(8.0), 4);
    assert_eq!(plan.index_for(8.4), 4);
    assert_eq!(plan.index_for(17.2), 9);
}

#[test]
fn index_for_clamps_into_plan() {
    let plan = plan(20.0);

    assert_eq!(plan.index_for(-4.0), 0);
    assert_eq!(plan.index_for(19.9), 9);
    assert_eq!(plan.index_for(1e9), 9);
    assert_eq!(plan.index_for(f64::NAN), 0);
    assert_eq!(plan.index_for(f64::INFINITY), 0);
}

#[test]
fn index_for_recovers_every_requested_timestamp() {
    for duration in [20.0, 95.0, 300.0] {
        let plan = plan(duration);
        for (index, &time) in plan.timestamps().iter().enumerate() {
            assert_eq!(plan.index_for(time), index, "duration {duration}");
        }
    }
}

#[test]
fn empty_plan_maps_everything_to_zero() {
    let plan = RequestPlan::empty();
    assert_eq!(plan.index_for(3.0), 0);
    assert_eq!(plan.interval(), 0.0);
}
