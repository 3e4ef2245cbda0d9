//! Metric availability checking
//!
//! A day earns a measured (non-fallback) energy score only when the four
//! required signal kinds are all present. Days failing the check flow
//! through the ineligible-day sentinel path rather than producing a
//! misleading low score.

use crate::models::{BiometricDayAggregate, MetricKind};

/// Minimum signal set for a measured energy score.
pub const REQUIRED_METRICS: [MetricKind; 4] = [
    MetricKind::StepCount,
    MetricKind::ActiveEnergy,
    MetricKind::AverageHeartRate,
    MetricKind::TimeInBed,
];

/// True iff every required metric kind is available for the day.
pub fn is_eligible(aggregate: &BiometricDayAggregate) -> bool {
    REQUIRED_METRICS
        .iter()
        .all(|kind| aggregate.available.contains(kind))
}

/// Required metric kinds absent from the day, for diagnostic strings.
pub fn missing_required(aggregate: &BiometricDayAggregate) -> Vec<MetricKind> {
    REQUIRED_METRICS
        .iter()
        .copied()
        .filter(|kind| !aggregate.available.contains(kind))
        .collect()
}

/// True iff the available set is exactly the required set, with no
/// enhancer metrics beyond it.
pub fn required_only(aggregate: &BiometricDayAggregate) -> bool {
    is_eligible(aggregate) && aggregate.available.len() == REQUIRED_METRICS.len()
}

/// A metric reading that is either present or missing
///
/// Makes fallback order an explicit data structure instead of nested
/// optional-chaining: build the ordered candidate list and take the first
/// present value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Present(f64),
    Missing,
}

impl MetricValue {
    /// The contained value, if present.
    pub fn value(self) -> Option<f64> {
        match self {
            MetricValue::Present(v) => Some(v),
            MetricValue::Missing => None,
        }
    }
}

impl From<Option<f64>> for MetricValue {
    fn from(opt: Option<f64>) -> Self {
        match opt {
            Some(v) => MetricValue::Present(v),
            None => MetricValue::Missing,
        }
    }
}

/// First present value in an ordered fallback chain, or the default.
pub fn first_present(chain: &[MetricValue], default: f64) -> f64 {
    chain
        .iter()
        .find_map(|candidate| candidate.value())
        .unwrap_or(default)
}
