//! Base energy calculation and historical aggregation
//!
//! One day's biometric aggregate collapses into a single 0-1 composite via
//! a fixed weighted formula. The weights are hand-tuned design constants
//! reflecting relative trust in each signal category; they must not change
//! without revalidating output parity.
//!
//! The historical aggregator smooths the composite across a rolling window
//! to produce the stable baseline the waveform shaper starts from.

use chrono::NaiveDateTime;

use crate::eligibility::{first_present, MetricValue};
use crate::models::BiometricDayAggregate;
use crate::normalize::{activity_score, normalize, projected_steps};

/// Weight of the sleep term in the composite.
pub const WEIGHT_SLEEP: f64 = 0.35;
/// Weight of the HRV term.
pub const WEIGHT_HRV: f64 = 0.25;
/// Weight of the inverse resting heart rate term.
pub const WEIGHT_INV_RESTING_HR: f64 = 0.15;
/// Weight of the combined deep+REM sleep term.
pub const WEIGHT_DEEP_REM: f64 = 0.15;
/// Weight of the activity balance term.
pub const WEIGHT_ACTIVITY: f64 = 0.10;

/// Sleep efficiency normalization bounds (percent).
pub const SLEEP_EFFICIENCY_RANGE: (f64, f64) = (60.0, 100.0);
/// Time-in-bed normalization bounds (minutes).
pub const TIME_IN_BED_RANGE: (f64, f64) = (300.0, 540.0);
/// HRV normalization bounds (milliseconds).
pub const HRV_RANGE: (f64, f64) = (20.0, 120.0);
/// Resting heart rate normalization bounds (bpm).
pub const RESTING_HR_RANGE: (f64, f64) = (40.0, 100.0);
/// Combined deep+REM normalization bounds (minutes).
pub const DEEP_REM_RANGE: (f64, f64) = (60.0, 300.0);

/// Neutral midpoint used wherever a term has no usable signal.
pub const NEUTRAL_ENERGY: f64 = 0.5;

/// Days of history considered by the aggregator.
pub const HISTORY_WINDOW_DAYS: usize = 14;
/// Valid composites averaged for the baseline.
pub const BASELINE_RECENT_DAYS: usize = 7;
/// The historical baseline never implies less energy than this.
///
/// A fully-missing day is handled by the eligibility path; poor-data days
/// must not drive the forecast baseline to zero.
pub const BASELINE_FLOOR: f64 = 0.3;

/// Per-term breakdown of one day's composite
///
/// Kept separate from the scalar composite so sub-scores and highlight
/// strings can reuse the same term values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyTerms {
    /// Sleep quality: efficiency, falling back to time in bed
    pub sleep: f64,
    /// Heart rate variability
    pub hrv: f64,
    /// Inverted resting heart rate (lower resting HR scores higher)
    pub inv_resting_hr: f64,
    /// Combined deep + REM sleep
    pub deep_rem: f64,
    /// Activity balance around the typical step count
    pub activity: f64,
}

impl EnergyTerms {
    /// Weighted composite of the terms, clamped to [0, 1].
    pub fn composite(&self) -> f64 {
        let value = WEIGHT_SLEEP * self.sleep
            + WEIGHT_HRV * self.hrv
            + WEIGHT_INV_RESTING_HR * self.inv_resting_hr
            + WEIGHT_DEEP_REM * self.deep_rem
            + WEIGHT_ACTIVITY * self.activity;
        value.clamp(0.0, 1.0)
    }
}

/// Compute the per-term breakdown for one day.
///
/// Fallback order within each term is an explicit [`MetricValue`] chain:
/// sleep prefers efficiency over time in bed; the resting HR term falls
/// back to the HRV-derived value; anything fully missing lands on the
/// neutral midpoint.
pub fn energy_terms(aggregate: &BiometricDayAggregate, now: NaiveDateTime) -> EnergyTerms {
    let sleep = first_present(
        &[
            MetricValue::from(
                aggregate
                    .sleep_efficiency_pct
                    .map(|v| normalize(v, SLEEP_EFFICIENCY_RANGE.0, SLEEP_EFFICIENCY_RANGE.1)),
            ),
            MetricValue::from(
                aggregate
                    .time_in_bed_min
                    .map(|v| normalize(v, TIME_IN_BED_RANGE.0, TIME_IN_BED_RANGE.1)),
            ),
        ],
        NEUTRAL_ENERGY,
    );

    let hrv_term = aggregate
        .hrv_ms
        .map(|v| normalize(v, HRV_RANGE.0, HRV_RANGE.1));
    let hrv = hrv_term.unwrap_or(NEUTRAL_ENERGY);

    let inv_resting_hr = first_present(
        &[
            MetricValue::from(
                aggregate
                    .resting_hr
                    .map(|v| 1.0 - normalize(v, RESTING_HR_RANGE.0, RESTING_HR_RANGE.1)),
            ),
            MetricValue::from(hrv_term),
        ],
        NEUTRAL_ENERGY,
    );

    let deep_rem = match (aggregate.deep_sleep_min, aggregate.rem_sleep_min) {
        (None, None) => NEUTRAL_ENERGY,
        (deep, rem) => normalize(
            deep.unwrap_or(0.0) + rem.unwrap_or(0.0),
            DEEP_REM_RANGE.0,
            DEEP_REM_RANGE.1,
        ),
    };

    let activity = aggregate
        .step_count
        .map(|steps| activity_score(projected_steps(steps, aggregate.date, now)))
        .unwrap_or(NEUTRAL_ENERGY);

    EnergyTerms {
        sleep,
        hrv,
        inv_resting_hr,
        deep_rem,
        activity,
    }
}

/// One day's composite, or `None` for a day with no samples.
pub fn base_energy(aggregate: &BiometricDayAggregate, now: NaiveDateTime) -> Option<f64> {
    if !aggregate.has_samples {
        return None;
    }
    Some(energy_terms(aggregate, now).composite())
}

/// One day's composite with the neutral default for missing days.
///
/// An absent or sample-free aggregate yields 0.5 rather than a false
/// low-energy signal.
pub fn base_energy_or_neutral(
    aggregate: Option<&BiometricDayAggregate>,
    now: NaiveDateTime,
) -> f64 {
    aggregate
        .and_then(|agg| base_energy(agg, now))
        .unwrap_or(NEUTRAL_ENERGY)
}

/// Smoothed baseline from a chronologically ordered history window.
///
/// Considers the most recent [`HISTORY_WINDOW_DAYS`] aggregates, keeps the
/// valid composites, and averages the most recent [`BASELINE_RECENT_DAYS`]
/// of those. Returns `None` when no valid composite exists, which callers
/// must treat as "cannot produce a historical-model forecast". The result
/// is floor-clamped at [`BASELINE_FLOOR`].
pub fn historical_baseline(
    history: &[&BiometricDayAggregate],
    now: NaiveDateTime,
) -> Option<f64> {
    let window_start = history.len().saturating_sub(HISTORY_WINDOW_DAYS);
    let valid: Vec<f64> = history[window_start..]
        .iter()
        .filter_map(|agg| base_energy(agg, now))
        .collect();
    if valid.is_empty() {
        return None;
    }

    let recent_start = valid.len().saturating_sub(BASELINE_RECENT_DAYS);
    let recent = &valid[recent_start..];
    let mean = recent.iter().sum::<f64>() / recent.len() as f64;
    Some(mean.max(BASELINE_FLOOR))
}
