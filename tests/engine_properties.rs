//! Property-based tests for the pure numeric core: normalization,
//! confidence tiers, waveform shaping, and blending all have range and
//! monotonicity guarantees that must hold for arbitrary inputs.

use chrono::NaiveDate;
use proptest::prelude::*;

use energyrs::blend::{blend_waveforms, forecast_accuracy};
use energyrs::confidence::history_confidence;
use energyrs::models::WAVEFORM_LEN;
use energyrs::normalize::{activity_score, normalize};
use energyrs::waveform::{reshape_magnitude, shape, CaffeineDipSettings, RESHAPE_MAGNITUDE_RANGE};

fn arb_waveform() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0f64..=1.0, WAVEFORM_LEN)
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (2020i32..2030, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

proptest! {
    #[test]
    fn normalize_stays_in_unit_interval(
        v in -1e6f64..1e6,
        lo in -1e3f64..1e3,
        span in 0.0f64..1e3,
    ) {
        let out = normalize(v, lo, lo + span);
        prop_assert!((0.0..=1.0).contains(&out));
    }

    #[test]
    fn normalize_is_monotonic(
        a in -1e4f64..1e4,
        b in -1e4f64..1e4,
        lo in -1e3f64..1e3,
        span in 1.0f64..1e3,
    ) {
        let (small, large) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(normalize(small, lo, lo + span) <= normalize(large, lo, lo + span));
    }

    #[test]
    fn activity_score_bounded_and_peaks_at_mean(steps in 0.0f64..50_000.0) {
        let score = activity_score(steps);
        prop_assert!((0.0..=1.0).contains(&score));
        prop_assert!(score <= activity_score(8000.0));
    }

    #[test]
    fn history_confidence_is_monotonic(a in 0usize..60, b in 0usize..60) {
        let (small, large) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(history_confidence(small) <= history_confidence(large));
    }

    #[test]
    fn reshape_magnitude_is_bounded(ordinal in -1_000_000i64..1_000_000) {
        let m = reshape_magnitude(ordinal);
        prop_assert!((RESHAPE_MAGNITUDE_RANGE.0..=RESHAPE_MAGNITUDE_RANGE.1).contains(&m));
    }

    #[test]
    fn shape_output_is_valid(
        baseline in 0.0f64..=1.0,
        confidence in 0.0f64..=1.0,
        date in arb_date(),
    ) {
        let (wave, score) = shape(
            baseline,
            &[],
            None,
            date,
            confidence,
            &CaffeineDipSettings::default(),
        );
        prop_assert_eq!(wave.len(), WAVEFORM_LEN);
        for value in wave {
            prop_assert!((0.0..=1.0).contains(&value));
        }
        let mean = wave.iter().sum::<f64>() / wave.len() as f64;
        prop_assert!((score - mean * 100.0).abs() < 1e-9);
    }

    #[test]
    fn shape_is_deterministic(
        baseline in 0.0f64..=1.0,
        confidence in 0.0f64..=1.0,
        date in arb_date(),
    ) {
        let settings = CaffeineDipSettings::default();
        let a = shape(baseline, &[], None, date, confidence, &settings);
        let b = shape(baseline, &[], None, date, confidence, &settings);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn blend_preserves_measured_prefix_and_forecast_tail(
        measured in arb_waveform(),
        forecast in arb_waveform(),
        current_hour in 0usize..WAVEFORM_LEN,
        window in 1usize..6,
    ) {
        let blended = blend_waveforms(&measured, &forecast, current_hour, window);
        prop_assert_eq!(blended.len(), WAVEFORM_LEN);

        for hour in 0..current_hour {
            prop_assert_eq!(blended[hour], measured[hour]);
        }
        let end = (current_hour + window).min(WAVEFORM_LEN - 1);
        for hour in end + 1..WAVEFORM_LEN {
            prop_assert_eq!(blended[hour], forecast[hour]);
        }
        // The window interpolates between two in-range endpoints
        for hour in current_hour..=end {
            prop_assert!((0.0..=1.0).contains(&blended[hour]), "hour {}", hour);
        }
        // The blend starts exactly at the measured value
        prop_assert_eq!(blended[current_hour], measured[current_hour]);
    }

    #[test]
    fn accuracy_is_bounded_and_perfect_for_identity(wave in arb_waveform()) {
        prop_assert!((forecast_accuracy(&wave, &wave) - 1.0).abs() < 1e-9);

        let inverted: Vec<f64> = wave.iter().map(|v| 1.0 - v).collect();
        let acc = forecast_accuracy(&wave, &inverted);
        prop_assert!((0.0..=1.0).contains(&acc));
    }
}
