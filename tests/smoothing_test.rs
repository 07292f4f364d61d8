//! Angle smoother behaviour through the public filter API

use pose_retarget::{
    filters::{create_filter, filter_for, FilterKind},
    Error,
};
use proptest::prelude::*;

#[test]
fn test_documented_sequence() {
    let mut filter = create_filter("exponential:0.1").unwrap();
    let outputs: Vec<f64> = [10.0, 12.0].iter().map(|&v| filter.apply(v)).collect();
    assert_eq!(outputs[0], 10.0);
    assert!((outputs[1] - 10.2).abs() < 1e-12);
}

#[test]
fn test_exponential_accuracy() {
    let mut filter = create_filter("exponential:0.5").unwrap();
    assert_eq!(filter.apply(10.0), 10.0, "First value initializes filter");
    assert_eq!(filter.apply(20.0), 15.0, "0.5 * 20 + 0.5 * 10 = 15");
    assert_eq!(filter.apply(30.0), 22.5, "0.5 * 30 + 0.5 * 15 = 22.5");
    assert_eq!(filter.current(), Some(22.5));
}

#[test]
fn test_passthrough() {
    let mut filter = create_filter("none").unwrap();
    for value in [1.23, -10.0, 0.0, 179.9] {
        assert_eq!(filter.apply(value), value);
    }
}

#[test]
fn test_invalid_alpha_rejected() {
    for descriptor in ["exponential:0", "exponential:-0.1", "exponential:1.01", "exponential:NaN"] {
        match create_filter(descriptor) {
            Err(Error::FilterError(msg)) => assert!(msg.contains("Alpha") || msg.contains("alpha"), "{msg}"),
            Err(other) => panic!("Expected FilterError for {descriptor}, got {other}"),
            Ok(_) => panic!("Expected error for {descriptor}"),
        }
    }
    assert!(filter_for(FilterKind::Exponential, f64::INFINITY).is_err());
}

#[test]
fn test_reset_starts_cold() {
    let mut filter = filter_for(FilterKind::Exponential, 0.3).unwrap();
    filter.apply(90.0);
    filter.apply(0.0);
    filter.reset();
    assert_eq!(filter.current(), None);
    assert_eq!(filter.apply(-45.0), -45.0);
}

proptest! {
    #[test]
    fn prop_cold_start(alpha in 0.001f64..=1.0, first in -180.0f64..180.0) {
        let mut filter = filter_for(FilterKind::Exponential, alpha).unwrap();
        prop_assert_eq!(filter.apply(first), first);
    }

    #[test]
    fn prop_monotone_convergence(
        alpha in 0.01f64..=1.0,
        start in -180.0f64..180.0,
        target in -180.0f64..180.0,
    ) {
        let mut filter = filter_for(FilterKind::Exponential, alpha).unwrap();
        let mut distance = (filter.apply(start) - target).abs();
        for _ in 0..100 {
            let next = filter.apply(target);
            let next_distance = (next - target).abs();
            prop_assert!(next_distance <= distance + 1e-9);
            // Output stays between the start and the target
            prop_assert!(next >= start.min(target) - 1e-9 && next <= start.max(target) + 1e-9);
            distance = next_distance;
        }
    }
}
