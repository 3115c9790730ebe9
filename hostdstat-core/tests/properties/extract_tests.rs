//! Property tests for numeric extraction

use hostdstat_core::probe::Extraction;
use proptest::prelude::*;

proptest! {
    /// Property: `<n>.<mm> MB` yields n.mm regardless of surrounding noise
    #[test]
    fn megabytes_found_in_noise(
        whole in 0u32..1_000_000,
        frac in 0u32..100,
        prefix in "[a-zA-Z :]{0,20}",
    ) {
        let text = format!("{prefix}{whole}.{frac:02} MB\n");
        let value = Extraction::Megabytes.extract(&text).unwrap();
        let expected = f64::from(whole) + f64::from(frac) / 100.0;
        prop_assert!((value - expected).abs() < 1e-6);
    }

    /// Property: the first integer in the output is the value
    #[test]
    fn first_integer_wins(first in 0u32..1_000_000, second in 0u32..1_000_000) {
        let text = format!("  {first}\n{second}\n");
        prop_assert_eq!(Extraction::Number.extract(&text).unwrap(), f64::from(first));
        prop_assert_eq!(Extraction::NumberOrZero.extract(&text).unwrap(), f64::from(first));
    }

    /// Property: whitespace-only output is zero only for `NumberOrZero`
    #[test]
    fn blank_output(blank in "[ \t\n]{0,8}") {
        prop_assert_eq!(Extraction::NumberOrZero.extract(&blank).unwrap(), 0.0);
        prop_assert!(Extraction::Number.extract(&blank).is_err());
        prop_assert!(Extraction::Megabytes.extract(&blank).is_err());
    }
}
