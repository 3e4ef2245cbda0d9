//! Waveform shaping
//!
//! Expands a scalar energy baseline into a 24-value hourly curve. Each
//! shaping step is a pure `[f64; 24] -> [f64; 24]` function composed in a
//! fixed order:
//!
//! 1. circadian template, phase-shifted by wake time and chronotype
//! 2. schedule event deltas spread over 3-hour windows
//! 3. caffeine withdrawal dip
//! 4. 5-point weighted smoothing of interior hours
//! 5. bed/wake boundary reshaping with a deterministic per-day magnitude
//! 6. confidence-aware amplitude compression
//!
//! Every stage clamps its output into [0, 1].

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{CaffeineTiming, Chronotype, ScheduleEvent, UserProfile, WAVEFORM_LEN};

/// Hand-authored circadian offset curve, summing near zero
///
/// Indexed by hour of day for a reference wake hour of 7: low overnight,
/// morning rise to a late-morning peak, post-lunch dip, secondary evening
/// peak, end-of-day decline.
pub const CIRCADIAN_TEMPLATE: [f64; WAVEFORM_LEN] = [
    -0.20, -0.24, -0.26, -0.26, -0.24, -0.18, -0.08, 0.02, 0.12, 0.18, 0.22, 0.20, 0.14, 0.06,
    0.00, 0.04, 0.10, 0.14, 0.12, 0.08, 0.02, -0.06, -0.14, -0.20,
];

/// Reference wake hour the template is authored against.
pub const TEMPLATE_WAKE_HOUR: i32 = 7;

/// Weights spreading an event delta over the 3-hour window centered on its
/// start hour.
pub const EVENT_WINDOW_WEIGHTS: [f64; 3] = [0.25, 0.5, 0.25];

/// Smoothing kernel applied to interior hours, normalized by its sum.
pub const SMOOTHING_KERNEL: [f64; 5] = [1.0, 2.0, 3.0, 2.0, 1.0];

/// Bounds of the deterministic bed/wake reshape magnitude.
pub const RESHAPE_MAGNITUDE_RANGE: (f64, f64) = (0.08, 0.15);

/// Hour 23 never exceeds this, reflecting end-of-day wind-down.
pub const WIND_DOWN_CAP: f64 = 0.5;

/// Below this confidence the curve is flattened toward the baseline.
pub const COMPRESSION_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Tunable caffeine-dip constants
///
/// Product-tuning values with no derived justification; preserved for
/// output parity but exposed for configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaffeineDipSettings {
    /// Daily intake above which the dip applies (mg)
    pub threshold_mg: f64,
    /// Magnitude subtracted at the dip hour
    pub dip: f64,
    /// Dip hour for morning caffeine
    pub morning_hour: usize,
    /// Dip hour for afternoon caffeine
    pub afternoon_hour: usize,
    /// Dip hour for evening caffeine
    pub evening_hour: usize,
}

impl Default for CaffeineDipSettings {
    fn default() -> Self {
        CaffeineDipSettings {
            threshold_mg: 300.0,
            dip: 0.1,
            morning_hour: 11,
            afternoon_hour: 18,
            evening_hour: 23,
        }
    }
}

/// Baseline plus phase-shifted circadian offsets, clamped per hour.
///
/// The shift is `(wake_hour - 7)` with a one-hour advance for morning
/// chronotypes and a one-hour delay for evening chronotypes.
pub fn apply_circadian(baseline: f64, profile: Option<&UserProfile>) -> [f64; WAVEFORM_LEN] {
    let wake_hour = profile.map(|p| p.wake_hour()).unwrap_or(7) as i32;
    let nudge = match profile.and_then(|p| p.chronotype) {
        Some(Chronotype::Morning) => -1,
        Some(Chronotype::Evening) => 1,
        _ => 0,
    };
    let shift = (wake_hour - TEMPLATE_WAKE_HOUR) + nudge;

    let mut wave = [0.0; WAVEFORM_LEN];
    for (hour, slot) in wave.iter_mut().enumerate() {
        let idx = (hour as i32 - shift).rem_euclid(WAVEFORM_LEN as i32) as usize;
        *slot = (baseline + CIRCADIAN_TEMPLATE[idx]).clamp(0.0, 1.0);
    }
    wave
}

/// Distribute each event's energy delta across a 3-hour window.
///
/// Weights are [`EVENT_WINDOW_WEIGHTS`] centered on the start hour, with
/// clamping after each addition so stacked events cannot escape [0, 1].
pub fn apply_event_deltas(
    wave: [f64; WAVEFORM_LEN],
    events: &[&ScheduleEvent],
) -> [f64; WAVEFORM_LEN] {
    let mut out = wave;
    for event in events {
        let delta = match event.energy_delta {
            Some(d) => d,
            None => continue,
        };
        let center = event.start_hour();
        if center >= WAVEFORM_LEN {
            continue;
        }
        for (offset, weight) in EVENT_WINDOW_WEIGHTS.iter().enumerate() {
            let hour = center as i32 + offset as i32 - 1;
            if (0..WAVEFORM_LEN as i32).contains(&hour) {
                let hour = hour as usize;
                out[hour] = (out[hour] + delta * weight).clamp(0.0, 1.0);
            }
        }
    }
    out
}

/// Subtract the stimulant-withdrawal dip when daily intake crosses the
/// threshold, at an hour chosen by the usual caffeine timing.
pub fn apply_caffeine_dip(
    wave: [f64; WAVEFORM_LEN],
    profile: Option<&UserProfile>,
    settings: &CaffeineDipSettings,
) -> [f64; WAVEFORM_LEN] {
    let mut out = wave;
    let profile = match profile {
        Some(p) => p,
        None => return out,
    };
    let intake = profile.caffeine_mg_per_day.unwrap_or(0.0);
    if intake <= settings.threshold_mg {
        return out;
    }
    let hour = match profile.caffeine_timing {
        Some(CaffeineTiming::Morning) | None => settings.morning_hour,
        Some(CaffeineTiming::Afternoon) => settings.afternoon_hour,
        Some(CaffeineTiming::Evening) => settings.evening_hour,
    };
    if hour < WAVEFORM_LEN {
        out[hour] = (out[hour] - settings.dip).max(0.0);
    }
    out
}

/// 5-point weighted smoothing of interior hours.
///
/// The first two and last two hours stay unsmoothed; values are read from
/// the input array so the pass has no aliasing on its own output.
pub fn smooth(wave: [f64; WAVEFORM_LEN]) -> [f64; WAVEFORM_LEN] {
    let kernel_sum: f64 = SMOOTHING_KERNEL.iter().sum();
    let mut out = wave;
    for hour in 2..WAVEFORM_LEN - 2 {
        let mut acc = 0.0;
        for (k, weight) in SMOOTHING_KERNEL.iter().enumerate() {
            acc += wave[hour + k - 2] * weight;
        }
        out[hour] = acc / kernel_sum;
    }
    out
}

/// Deterministic per-day reshape magnitude in [0.08, 0.15].
///
/// Seeded from the day ordinal so the same day always reshapes
/// identically; the bit mixing is a splitmix64 finalizer.
pub fn reshape_magnitude(day_ordinal: i64) -> f64 {
    let mut x = (day_ordinal as u64).wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^= x >> 31;
    let unit = (x >> 11) as f64 / (1u64 << 53) as f64;
    let (lo, hi) = RESHAPE_MAGNITUDE_RANGE;
    lo + unit * (hi - lo)
}

/// Reshape the hours surrounding bed and wake times.
///
/// A ramped amount is subtracted from the 1-3 hours before bedtime
/// (larger closer to bedtime) and added to the 1-3 hours after wake time
/// (larger closer to waking). Hour 23 is then capped at the wind-down
/// limit regardless of other adjustments.
pub fn reshape_bed_wake(
    wave: [f64; WAVEFORM_LEN],
    date: NaiveDate,
    profile: Option<&UserProfile>,
) -> [f64; WAVEFORM_LEN] {
    let mut out = wave;
    let magnitude = reshape_magnitude(date.num_days_from_ce() as i64);
    let bed_hour = profile.map(|p| p.bed_hour()).unwrap_or(23) as i32;
    let wake_hour = profile.map(|p| p.wake_hour()).unwrap_or(7) as i32;

    for k in 1..=3i32 {
        let ramp = magnitude * (4 - k) as f64 / 3.0;
        let before_bed = bed_hour - k;
        if (0..WAVEFORM_LEN as i32).contains(&before_bed) {
            let idx = before_bed as usize;
            out[idx] = (out[idx] - ramp).max(0.0);
        }
        let after_wake = wake_hour + k;
        if (0..WAVEFORM_LEN as i32).contains(&after_wake) {
            let idx = after_wake as usize;
            out[idx] = (out[idx] + ramp).min(1.0);
        }
    }

    out[23] = out[23].min(WIND_DOWN_CAP);
    out
}

/// Shrink each hour's deviation from the baseline when confidence is low.
///
/// Below the threshold the deviation scales by `0.5 + confidence`, so a
/// low-confidence day produces a flatter, more conservative curve instead
/// of a dramatic but unsubstantiated shape.
pub fn compress_amplitude(
    wave: [f64; WAVEFORM_LEN],
    baseline: f64,
    confidence: f64,
) -> [f64; WAVEFORM_LEN] {
    if confidence >= COMPRESSION_CONFIDENCE_THRESHOLD {
        return wave;
    }
    let factor = 0.5 + confidence;
    let mut out = wave;
    for value in out.iter_mut() {
        *value = (baseline + (*value - baseline) * factor).clamp(0.0, 1.0);
    }
    out
}

/// Full shaping pipeline: scalar baseline in, 24-value waveform and its
/// derived score out.
pub fn shape(
    baseline: f64,
    events: &[&ScheduleEvent],
    profile: Option<&UserProfile>,
    date: NaiveDate,
    confidence: f64,
    caffeine: &CaffeineDipSettings,
) -> ([f64; WAVEFORM_LEN], f64) {
    let wave = apply_circadian(baseline, profile);
    let wave = apply_event_deltas(wave, events);
    let wave = apply_caffeine_dip(wave, profile, caffeine);
    let wave = smooth(wave);
    let wave = reshape_bed_wake(wave, date, profile);
    let wave = compress_amplitude(wave, baseline, confidence);
    let score = crate::models::waveform_score(&wave);
    (wave, score)
}
