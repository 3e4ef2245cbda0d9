//! Core data model for the energy forecasting engine
//!
//! The engine consumes three read-only inputs produced by external
//! collaborators (a health data source, a calendar source, and a profile
//! store) and produces two outputs: [`DayEnergySummary`] for presentation
//! layers and [`DayEnergyForecast`] records for the forecast cache.
//!
//! All input snapshots are immutable once constructed. Summaries follow
//! copy-and-replace semantics: a field update produces a new value rather
//! than mutating in place.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Length of every non-empty hourly waveform.
pub const WAVEFORM_LEN: usize = 24;

/// Metric categories a biometric day aggregate can carry
///
/// Coverage ratio is computed against the full set ([`MetricKind::ALL`]),
/// while energy eligibility only requires the subset in
/// [`crate::eligibility::REQUIRED_METRICS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    /// Heart rate variability (RMSSD, milliseconds)
    HeartRateVariability,
    /// Resting heart rate (bpm)
    RestingHeartRate,
    /// Average heart rate across the day (bpm)
    AverageHeartRate,
    /// Sleep efficiency percentage
    SleepEfficiency,
    /// Sleep onset latency (minutes)
    SleepLatency,
    /// Deep sleep duration (minutes)
    DeepSleep,
    /// REM sleep duration (minutes)
    RemSleep,
    /// Time in bed (minutes)
    TimeInBed,
    /// Daily step count
    StepCount,
    /// Active energy burned (kcal)
    ActiveEnergy,
}

impl MetricKind {
    /// All metric kinds the engine tracks, in canonical order.
    pub const ALL: [MetricKind; 10] = [
        MetricKind::HeartRateVariability,
        MetricKind::RestingHeartRate,
        MetricKind::AverageHeartRate,
        MetricKind::SleepEfficiency,
        MetricKind::SleepLatency,
        MetricKind::DeepSleep,
        MetricKind::RemSleep,
        MetricKind::TimeInBed,
        MetricKind::StepCount,
        MetricKind::ActiveEnergy,
    ];
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricKind::HeartRateVariability => "HRV",
            MetricKind::RestingHeartRate => "resting heart rate",
            MetricKind::AverageHeartRate => "average heart rate",
            MetricKind::SleepEfficiency => "sleep efficiency",
            MetricKind::SleepLatency => "sleep latency",
            MetricKind::DeepSleep => "deep sleep",
            MetricKind::RemSleep => "REM sleep",
            MetricKind::TimeInBed => "time in bed",
            MetricKind::StepCount => "steps",
            MetricKind::ActiveEnergy => "active energy",
        };
        write!(f, "{}", name)
    }
}

/// One calendar day's summarized physiological measurements
///
/// Produced once per day by the external health collaborator and consumed
/// read-only by the engine. The `available` set records which metric kinds
/// were actually measured. [`BiometricDayAggregate::with_derived_availability`]
/// rebuilds the set from the populated fields for inputs that arrive
/// without one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiometricDayAggregate {
    /// Calendar day the aggregate describes
    pub date: NaiveDate,

    /// Heart rate variability, RMSSD in milliseconds
    pub hrv_ms: Option<f64>,

    /// Resting heart rate in bpm
    pub resting_hr: Option<f64>,

    /// Average heart rate across the day in bpm
    pub avg_hr: Option<f64>,

    /// Sleep efficiency percentage (0-100)
    pub sleep_efficiency_pct: Option<f64>,

    /// Sleep onset latency in minutes
    pub sleep_latency_min: Option<f64>,

    /// Deep sleep in minutes
    pub deep_sleep_min: Option<f64>,

    /// REM sleep in minutes
    pub rem_sleep_min: Option<f64>,

    /// Time in bed in minutes
    pub time_in_bed_min: Option<f64>,

    /// Step count for the day
    pub step_count: Option<f64>,

    /// Active energy burned in kcal
    pub active_energy_kcal: Option<f64>,

    /// Metric kinds measured on this day
    #[serde(default)]
    pub available: BTreeSet<MetricKind>,

    /// True if the day carried any samples at all
    #[serde(default)]
    pub has_samples: bool,
}

impl BiometricDayAggregate {
    /// Create an empty aggregate for a day with no samples.
    pub fn empty(date: NaiveDate) -> Self {
        BiometricDayAggregate {
            date,
            hrv_ms: None,
            resting_hr: None,
            avg_hr: None,
            sleep_efficiency_pct: None,
            sleep_latency_min: None,
            deep_sleep_min: None,
            rem_sleep_min: None,
            time_in_bed_min: None,
            step_count: None,
            active_energy_kcal: None,
            available: BTreeSet::new(),
            has_samples: false,
        }
    }

    /// Rebuild the availability set and sample flag from the populated fields.
    ///
    /// Used by the import path for snapshots that carry only raw values.
    pub fn with_derived_availability(mut self) -> Self {
        let mut available = BTreeSet::new();
        let pairs: [(MetricKind, bool); 10] = [
            (MetricKind::HeartRateVariability, self.hrv_ms.is_some()),
            (MetricKind::RestingHeartRate, self.resting_hr.is_some()),
            (MetricKind::AverageHeartRate, self.avg_hr.is_some()),
            (MetricKind::SleepEfficiency, self.sleep_efficiency_pct.is_some()),
            (MetricKind::SleepLatency, self.sleep_latency_min.is_some()),
            (MetricKind::DeepSleep, self.deep_sleep_min.is_some()),
            (MetricKind::RemSleep, self.rem_sleep_min.is_some()),
            (MetricKind::TimeInBed, self.time_in_bed_min.is_some()),
            (MetricKind::StepCount, self.step_count.is_some()),
            (MetricKind::ActiveEnergy, self.active_energy_kcal.is_some()),
        ];
        for (kind, present) in pairs {
            if present {
                available.insert(kind);
            }
        }
        self.has_samples = !available.is_empty();
        self.available = available;
        self
    }
}

/// A scheduled calendar event with an optional learned energy impact
///
/// The delta is in [-1, +1]; an absent delta means the event's impact is
/// unlearned and it contributes nothing to the waveform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEvent {
    /// Event title
    pub title: String,

    /// Event start
    pub start: NaiveDateTime,

    /// Event end
    pub end: NaiveDateTime,

    /// All-day events carry no meaningful start hour
    pub all_day: bool,

    /// Modeled effect on the energy waveform, in [-1, +1]
    pub energy_delta: Option<f64>,
}

impl ScheduleEvent {
    /// Create an event, clamping any delta into [-1, +1].
    pub fn new(
        title: impl Into<String>,
        start: NaiveDateTime,
        end: NaiveDateTime,
        all_day: bool,
        energy_delta: Option<f64>,
    ) -> Self {
        ScheduleEvent {
            title: title.into(),
            start,
            end,
            all_day,
            energy_delta: energy_delta.map(|d| d.clamp(-1.0, 1.0)),
        }
    }

    /// Hour of day the event starts at.
    pub fn start_hour(&self) -> usize {
        self.start.hour() as usize
    }
}

/// Chronotype category used to nudge the circadian phase shift
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chronotype {
    /// Earlier peak; circadian curve advanced by one hour
    Morning,
    /// No nudge
    Intermediate,
    /// Later peak; circadian curve delayed by one hour
    Evening,
}

/// Usual time of day caffeine is consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaffeineTiming {
    Morning,
    Afternoon,
    Evening,
}

/// Optional personalization snapshot
///
/// Owned and persisted by an external store; the engine reads it to place
/// the circadian phase, the bed/wake reshaping window, and the caffeine dip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UserProfile {
    /// Usual wake time
    pub wake_time: Option<NaiveTime>,

    /// Usual bed time
    pub sleep_time: Option<NaiveTime>,

    /// Chronotype category
    pub chronotype: Option<Chronotype>,

    /// Exercise sessions per week
    pub exercise_days_per_week: Option<u8>,

    /// Daily caffeine intake in milligrams
    pub caffeine_mg_per_day: Option<f64>,

    /// Usual caffeine timing
    pub caffeine_timing: Option<CaffeineTiming>,

    /// Uses a sleep aid
    #[serde(default)]
    pub uses_sleep_aid: bool,

    /// Screen use before bed
    #[serde(default)]
    pub screens_before_bed: bool,

    /// Eats meals at regular times
    #[serde(default)]
    pub regular_meals: bool,

    /// Free-text notes
    pub notes: Option<String>,
}

/// Default wake hour used when the profile carries no wake time.
pub const DEFAULT_WAKE_HOUR: usize = 7;

/// Default bed hour used when the profile carries no sleep time.
pub const DEFAULT_BED_HOUR: usize = 23;

impl UserProfile {
    /// Wake hour of day, defaulting to 7.
    pub fn wake_hour(&self) -> usize {
        self.wake_time
            .map(|t| t.hour() as usize)
            .unwrap_or(DEFAULT_WAKE_HOUR)
    }

    /// Bed hour of day, defaulting to 23.
    pub fn bed_hour(&self) -> usize {
        self.sleep_time
            .map(|t| t.hour() as usize)
            .unwrap_or(DEFAULT_BED_HOUR)
    }
}

/// Source tag distinguishing trusted forecasts from fallbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastSource {
    /// Derived from genuine historical biometric trends
    HistoricalModel,
    /// Neutral-baseline fallback produced without usable history
    DefaultHeuristic,
}

impl fmt::Display for ForecastSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForecastSource::HistoricalModel => write!(f, "historical"),
            ForecastSource::DefaultHeuristic => write!(f, "heuristic"),
        }
    }
}

/// Cached forecast payload for one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayEnergyForecast {
    /// Day the forecast describes
    pub date: NaiveDate,

    /// 24-value hourly waveform, each in [0, 1]
    pub hourly_waveform: Vec<f64>,

    /// Aggregate score (mean of the waveform, scaled to 0-100)
    pub score: f64,

    /// Confidence in [0, 1]
    pub confidence: f64,

    /// Required metric kinds absent when the forecast was built
    pub missing_metrics: Vec<MetricKind>,

    /// Whether the forecast came from real history or the fallback heuristic
    pub source: ForecastSource,

    /// Diagnostic string
    pub debug: Option<String>,
}

/// Engine output for one requested day
///
/// Constructed fresh per request and never mutated afterwards; use
/// [`DayEnergySummary::with_waveform`] for copy-and-replace updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayEnergySummary {
    /// Day the summary describes
    pub date: NaiveDate,

    /// Overall energy score (0-100), always the mean of the waveform x 100
    /// except for the empty-waveform sentinel
    pub overall_score: f64,

    /// Mental energy sub-score (0-100)
    pub mental_score: f64,

    /// Physical energy sub-score (0-100)
    pub physical_score: f64,

    /// Sleep efficiency percentage, if measured
    pub sleep_efficiency_pct: Option<f64>,

    /// Fraction of tracked metric kinds present (0-1)
    pub coverage: f64,

    /// Confidence in the estimate (0-1)
    pub confidence: f64,

    /// Data-quality warning, if any
    pub warning: Option<String>,

    /// Diagnostic string
    pub debug: String,

    /// 24-value hourly waveform, or empty for the ineligible-day sentinel
    pub hourly_waveform: Vec<f64>,

    /// Titles of events with a positive energy delta, strongest first
    pub boosters: Vec<String>,

    /// Titles of events with a negative energy delta, strongest first
    pub drainers: Vec<String>,

    /// Up to 5 human-readable highlight strings
    pub highlights: Vec<String>,
}

impl DayEnergySummary {
    /// Replace the waveform, recomputing the overall score from its mean so
    /// the two never disagree.
    pub fn with_waveform(mut self, waveform: Vec<f64>) -> Self {
        self.overall_score = waveform_score(&waveform);
        self.hourly_waveform = waveform;
        self
    }

    /// Ineligible-day sentinel: zero score, zero confidence, empty waveform.
    ///
    /// The empty waveform is the system-wide signal that no energy estimate
    /// should be displayed or cached as a real forecast.
    pub fn insufficient(date: NaiveDate, coverage: f64, debug: String) -> Self {
        DayEnergySummary {
            date,
            overall_score: 0.0,
            mental_score: 0.0,
            physical_score: 0.0,
            sleep_efficiency_pct: None,
            coverage,
            confidence: 0.0,
            warning: Some(crate::confidence::INSUFFICIENT_DATA_WARNING.to_string()),
            debug,
            hourly_waveform: Vec::new(),
            boosters: Vec::new(),
            drainers: Vec::new(),
            highlights: Vec::new(),
        }
    }

    /// Fixed neutral placeholder for empty-data demo/test contexts.
    pub fn neutral_placeholder(date: NaiveDate) -> Self {
        DayEnergySummary {
            date,
            overall_score: 50.0,
            mental_score: 50.0,
            physical_score: 50.0,
            sleep_efficiency_pct: None,
            coverage: 0.0,
            confidence: 0.0,
            warning: None,
            debug: "simulated-mode placeholder".to_string(),
            hourly_waveform: vec![0.5; WAVEFORM_LEN],
            boosters: Vec::new(),
            drainers: Vec::new(),
            highlights: Vec::new(),
        }
    }
}

/// Score derived from a waveform: mean of the values scaled to 0-100.
///
/// An empty waveform scores 0.
pub fn waveform_score(waveform: &[f64]) -> f64 {
    if waveform.is_empty() {
        return 0.0;
    }
    waveform.iter().sum::<f64>() / waveform.len() as f64 * 100.0
}

/// Materialized input snapshot for a summary request
///
/// The engine never fetches anything itself; collaborators hand it a
/// chronologically ordered look-back window of aggregates, the events for
/// the visible range, and an optional profile.
#[derive(Debug, Clone, Default)]
pub struct DayInputs {
    /// Biometric aggregates, ordered oldest to newest
    pub biometrics: Vec<BiometricDayAggregate>,

    /// Schedule events for the requested range
    pub events: Vec<ScheduleEvent>,

    /// Optional personalization snapshot
    pub profile: Option<UserProfile>,
}

impl DayInputs {
    /// The aggregate for a specific day, if present in the window.
    pub fn aggregate_for(&self, date: NaiveDate) -> Option<&BiometricDayAggregate> {
        self.biometrics.iter().find(|a| a.date == date)
    }

    /// Events starting on a specific day, all-day events excluded.
    pub fn events_for(&self, date: NaiveDate) -> Vec<&ScheduleEvent> {
        self.events
            .iter()
            .filter(|e| !e.all_day && e.start.date() == date)
            .collect()
    }

    /// Aggregates strictly before a day, in chronological order.
    pub fn history_before(&self, date: NaiveDate) -> Vec<&BiometricDayAggregate> {
        self.biometrics.iter().filter(|a| a.date < date).collect()
    }

    /// Number of sampled days strictly before a day.
    pub fn history_len(&self, date: NaiveDate) -> usize {
        self.biometrics
            .iter()
            .filter(|a| a.date < date && a.has_samples)
            .count()
    }
}
