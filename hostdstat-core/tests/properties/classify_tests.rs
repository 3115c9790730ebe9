//! Property tests for threshold classification

use hostdstat_core::classify::{RED_THRESHOLD_PERCENT, WARNING_THRESHOLD_PERCENT, usage_percent};
use hostdstat_core::{Band, classify, classify_values};
use proptest::prelude::*;

proptest! {
    /// Property: the band agrees with the computed ratio for any positive limit
    #[test]
    fn band_matches_ratio(
        usage in 0.0f64..1_000_000.0,
        limit in 0.001f64..1_000_000.0,
    ) {
        let ratio = usage * 100.0 / limit;
        let expected = if ratio >= RED_THRESHOLD_PERCENT {
            Band::Red
        } else if ratio >= WARNING_THRESHOLD_PERCENT {
            Band::Warning
        } else {
            Band::Green
        };
        prop_assert_eq!(classify(usage, limit), expected);
    }

    /// Property: a non-positive limit is always unknown
    #[test]
    fn non_positive_limit_is_unknown(
        usage in -1_000.0f64..1_000_000.0,
        limit in -1_000_000.0f64..=0.0,
    ) {
        prop_assert_eq!(classify(usage, limit), Band::Unknown);
        prop_assert!(usage_percent(usage, limit).is_none());
    }

    /// Property: raising usage never lowers the band
    #[test]
    fn band_is_monotonic_in_usage(
        usage in 0.0f64..10_000.0,
        extra in 0.0f64..10_000.0,
        limit in 1.0f64..10_000.0,
    ) {
        let rank = |band: Band| match band {
            Band::Green => 0,
            Band::Warning => 1,
            Band::Red => 2,
            Band::Unknown => 3,
        };
        prop_assert!(rank(classify(usage, limit)) <= rank(classify(usage + extra, limit)));
    }

    /// Property: any missing value is unknown
    #[test]
    fn missing_values_are_unknown(value in 0.0f64..1_000.0) {
        prop_assert_eq!(classify_values(None, Some(value)), Band::Unknown);
        prop_assert_eq!(classify_values(Some(value), None), Band::Unknown);
    }
}

#[test]
fn documented_boundaries() {
    assert_eq!(classify(94.9, 100.0), Band::Warning);
    assert_eq!(classify(95.0, 100.0), Band::Red);
    assert_eq!(classify(84.999, 100.0), Band::Green);
    assert_eq!(classify(85.0, 100.0), Band::Warning);
    assert_eq!(classify(42.0, 0.0), Band::Unknown);
}
