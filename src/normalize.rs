//! Normalization utilities
//!
//! Small pure helpers shared by the base energy calculator: bounded linear
//! rescaling, a Gaussian activity proximity score, and partial-day step
//! projection. Degenerate numeric input never propagates; every helper
//! degrades to the neutral midpoint 0.5.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use statrs::distribution::{Continuous, Normal};

/// Step count at which activity scores peak.
pub const ACTIVITY_MEAN_STEPS: f64 = 8000.0;

/// Spread of the activity proximity curve.
pub const ACTIVITY_SD_STEPS: f64 = 3000.0;

/// Linear map of `v` from `[lo, hi]` onto `[0, 1]`, clamped.
///
/// Returns 0.5 for a degenerate range (`hi <= lo`) so a bad bound can never
/// divide by zero or invert the sign of a term.
pub fn normalize(v: f64, lo: f64, hi: f64) -> f64 {
    if hi <= lo {
        return 0.5;
    }
    ((v - lo) / (hi - lo)).clamp(0.0, 1.0)
}

/// Gaussian-shaped proximity score for daily step count.
///
/// Peaks at 1.0 at [`ACTIVITY_MEAN_STEPS`] and falls off symmetrically, so
/// both sedentary and overreached days score below a typical day.
pub fn activity_score(steps: f64) -> f64 {
    activity_score_with(steps, ACTIVITY_MEAN_STEPS, ACTIVITY_SD_STEPS)
}

/// Activity proximity score against a personal mean and spread.
pub fn activity_score_with(steps: f64, mean: f64, sd: f64) -> f64 {
    let dist = match Normal::new(mean, sd) {
        Ok(d) => d,
        Err(_) => return 0.5,
    };
    // Density ratio against the peak keeps the maximum at exactly 1.0.
    dist.pdf(steps) / dist.pdf(mean)
}

/// Extrapolate partial-day steps to a full-day estimate.
///
/// Same-day step counts read early in the day would otherwise bias the
/// activity term toward "low energy". Any other date passes through
/// unchanged.
pub fn projected_steps(observed: f64, date: NaiveDate, now: NaiveDateTime) -> f64 {
    if date != now.date() {
        return observed;
    }
    let hours_elapsed = now.hour().max(1) as f64;
    (observed * 24.0 / hours_elapsed).round()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_endpoints() {
        assert_eq!(normalize(60.0, 60.0, 100.0), 0.0);
        assert_eq!(normalize(100.0, 60.0, 100.0), 1.0);
        assert_eq!(normalize(80.0, 60.0, 100.0), 0.5);
    }

    #[test]
    fn test_normalize_clamps_out_of_range() {
        assert_eq!(normalize(20.0, 60.0, 100.0), 0.0);
        assert_eq!(normalize(140.0, 60.0, 100.0), 1.0);
    }

    #[test]
    fn test_normalize_degenerate_range() {
        assert_eq!(normalize(50.0, 100.0, 100.0), 0.5);
        assert_eq!(normalize(50.0, 100.0, 60.0), 0.5);
    }

    #[test]
    fn test_activity_score_peaks_at_mean() {
        let peak = activity_score(ACTIVITY_MEAN_STEPS);
        assert!((peak - 1.0).abs() < 1e-9);

        // Symmetric falloff on both sides of the mean
        let low = activity_score(5000.0);
        let high = activity_score(11000.0);
        assert!((low - high).abs() < 1e-9);
        assert!(low < peak);
    }

    #[test]
    fn test_activity_score_extremes_near_zero() {
        assert!(activity_score(0.0) < 0.05);
        assert!(activity_score(30000.0) < 0.05);
    }

    #[test]
    fn test_activity_score_degenerate_sd() {
        assert_eq!(activity_score_with(8000.0, 8000.0, 0.0), 0.5);
    }

    #[test]
    fn test_projected_steps_other_day_passthrough() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let now = NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(projected_steps(4000.0, date, now), 4000.0);
    }

    #[test]
    fn test_projected_steps_today_extrapolates() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let now = date.and_hms_opt(12, 0, 0).unwrap();
        // 4000 steps by noon projects to 8000 for the day
        assert_eq!(projected_steps(4000.0, date, now), 8000.0);
    }

    #[test]
    fn test_projected_steps_minimum_divisor() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let now = date.and_hms_opt(0, 30, 0).unwrap();
        // Midnight hour uses a 1-hour divisor, not zero
        assert_eq!(projected_steps(100.0, date, now), 2400.0);
    }
}
