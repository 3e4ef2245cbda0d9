//! Confidence scoring
//!
//! Derives a 0-1 confidence value and an optional warning from signal
//! coverage and history depth. Confidence is non-decreasing both in the
//! number of available metric kinds (holding history fixed) and in history
//! length (holding metrics fixed).

use std::collections::BTreeSet;

use crate::eligibility::REQUIRED_METRICS;
use crate::models::MetricKind;

/// Warning attached to the ineligible-day sentinel.
pub const INSUFFICIENT_DATA_WARNING: &str = "Insufficient health data";

/// Warning attached when the estimate rests on a thin metric set.
pub const LIMITED_METRICS_WARNING: &str =
    "Limited health metrics available; estimate is low confidence";

/// Confidence floor with no history.
pub const CONFIDENCE_BASE: f64 = 0.2;
/// Confidence with at least 3 days of history.
pub const CONFIDENCE_SHORT_HISTORY: f64 = 0.4;
/// Confidence with at least 7 days of history, or a rich metric set.
pub const CONFIDENCE_FULL: f64 = 0.8;
/// History days required for the mid confidence tier.
pub const SHORT_HISTORY_DAYS: usize = 3;
/// History days required for the full confidence tier.
pub const FULL_HISTORY_DAYS: usize = 7;
/// Available metric kinds that lift confidence to the full tier.
pub const RICH_METRIC_COUNT: usize = 5;

/// Confidence value plus optional data-quality warning
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceAssessment {
    pub confidence: f64,
    pub warning: Option<String>,
}

/// Fraction of all tracked metric kinds present, independent of confidence.
pub fn coverage(available_count: usize) -> f64 {
    available_count as f64 / MetricKind::ALL.len() as f64
}

/// Confidence from history depth alone, used for forecasts of days that
/// have no measured metrics yet.
pub fn history_confidence(history_days: usize) -> f64 {
    if history_days >= FULL_HISTORY_DAYS {
        CONFIDENCE_FULL
    } else if history_days >= SHORT_HISTORY_DAYS {
        CONFIDENCE_SHORT_HISTORY
    } else {
        CONFIDENCE_BASE
    }
}

/// Assess confidence for a day's available metric set and history depth.
///
/// History sets the starting tier; availability then overrides it: a day
/// missing required metrics is forced down to the floor, a bare
/// required-only set is capped at the mid tier, and a rich set lifts
/// confidence to the full tier.
pub fn assess(available: &BTreeSet<MetricKind>, history_days: usize) -> ConfidenceAssessment {
    let mut confidence = history_confidence(history_days);
    let mut warning = None;

    let eligible = REQUIRED_METRICS.iter().all(|kind| available.contains(kind));
    if !eligible {
        confidence = CONFIDENCE_BASE;
        warning = Some(LIMITED_METRICS_WARNING.to_string());
    } else if available.len() == REQUIRED_METRICS.len() {
        confidence = confidence.min(CONFIDENCE_SHORT_HISTORY);
        warning = Some(LIMITED_METRICS_WARNING.to_string());
    }

    if eligible && available.len() >= RICH_METRIC_COUNT {
        confidence = confidence.max(CONFIDENCE_FULL);
    }

    ConfidenceAssessment {
        confidence,
        warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(kinds: &[MetricKind]) -> BTreeSet<MetricKind> {
        kinds.iter().copied().collect()
    }

    fn required() -> BTreeSet<MetricKind> {
        set(&REQUIRED_METRICS)
    }

    fn rich() -> BTreeSet<MetricKind> {
        let mut s = required();
        s.insert(MetricKind::HeartRateVariability);
        s.insert(MetricKind::SleepEfficiency);
        s
    }

    #[test]
    fn test_coverage_ratio() {
        assert_eq!(coverage(0), 0.0);
        assert_eq!(coverage(5), 0.5);
        assert_eq!(coverage(10), 1.0);
    }

    #[test]
    fn test_history_tiers() {
        assert_eq!(history_confidence(0), 0.2);
        assert_eq!(history_confidence(2), 0.2);
        assert_eq!(history_confidence(3), 0.4);
        assert_eq!(history_confidence(6), 0.4);
        assert_eq!(history_confidence(7), 0.8);
        assert_eq!(history_confidence(30), 0.8);
    }

    #[test]
    fn test_ineligible_forced_to_floor() {
        let available = set(&[MetricKind::StepCount, MetricKind::HeartRateVariability]);
        let result = assess(&available, 10);
        assert_eq!(result.confidence, CONFIDENCE_BASE);
        assert_eq!(result.warning.as_deref(), Some(LIMITED_METRICS_WARNING));
    }

    #[test]
    fn test_required_only_capped() {
        let result = assess(&required(), 10);
        assert_eq!(result.confidence, CONFIDENCE_SHORT_HISTORY);
        assert!(result.warning.is_some());

        // With little history the cap does not raise anything
        let result = assess(&required(), 0);
        assert_eq!(result.confidence, CONFIDENCE_BASE);
    }

    #[test]
    fn test_rich_metrics_lift_confidence() {
        let result = assess(&rich(), 0);
        assert_eq!(result.confidence, CONFIDENCE_FULL);
        assert!(result.warning.is_none());
    }

    #[test]
    fn test_monotonic_in_metrics() {
        for history in [0, 3, 7, 20] {
            let sparse = assess(&set(&[MetricKind::StepCount]), history).confidence;
            let bare = assess(&required(), history).confidence;
            let full = assess(&rich(), history).confidence;
            assert!(sparse <= bare, "history {}", history);
            assert!(bare <= full, "history {}", history);
        }
    }

    #[test]
    fn test_monotonic_in_history() {
        for available in [required(), rich()] {
            let mut last = 0.0;
            for history in [0, 3, 7, 14] {
                let c = assess(&available, history).confidence;
                assert!(c >= last);
                last = c;
            }
        }
    }
}
