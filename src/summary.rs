//! Day summarization and top-level routing
//!
//! [`measured_summary`] composes the eligibility check, base energy
//! calculation, confidence scoring, and waveform shaping for a single
//! day's actual data. [`SummaryProvider`] is the engine's entry point: it
//! applies the cache-preference policy for past days, the type-tagged
//! invalidation rules, and the guarantee that consumers always receive a
//! well-formed waveform.

use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::baseline::{energy_terms, EnergyTerms};
use crate::blend::{is_realized, UnifiedBlender};
use crate::cache::{CacheError, ForecastRepository};
use crate::clock::Clock;
use crate::confidence::{assess, coverage, LIMITED_METRICS_WARNING};
use crate::config::EngineConfig;
use crate::eligibility::{is_eligible, missing_required};
use crate::models::{
    waveform_score, BiometricDayAggregate, DayEnergyForecast, DayEnergySummary, DayInputs,
    ForecastSource, ScheduleEvent, UserProfile, WAVEFORM_LEN,
};
use crate::normalize::ACTIVITY_MEAN_STEPS;
use crate::waveform::shape;

/// Maximum explanatory bullets carried by a summary.
pub const MAX_HIGHLIGHTS: usize = 5;

/// Mental sub-score weights: sleep, HRV, deep+REM.
const MENTAL_WEIGHTS: (f64, f64, f64) = (0.45, 0.35, 0.20);
/// Physical sub-score weights: activity, inverse resting HR, sleep.
const PHYSICAL_WEIGHTS: (f64, f64, f64) = (0.40, 0.30, 0.30);

/// Summary for one day computed from that day's actual data.
///
/// Ineligible days (no samples or missing required metrics) return the
/// empty-waveform sentinel instead of a misleading score.
pub fn measured_summary(
    date: NaiveDate,
    inputs: &DayInputs,
    config: &EngineConfig,
    now: NaiveDateTime,
) -> DayEnergySummary {
    let aggregate = match inputs.aggregate_for(date) {
        Some(agg) if agg.has_samples => agg,
        _ => {
            return DayEnergySummary::insufficient(date, 0.0, "no samples recorded".to_string())
        }
    };

    let cov = coverage(aggregate.available.len());
    if !is_eligible(aggregate) {
        let missing = missing_required(aggregate)
            .iter()
            .map(|kind| kind.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return DayEnergySummary::insufficient(
            date,
            cov,
            format!("missing required metrics: {}", missing),
        );
    }

    let history_len = inputs.history_len(date);
    let terms = energy_terms(aggregate, now);
    let base = terms.composite();
    let assessment = assess(&aggregate.available, history_len);

    let events = inputs.events_for(date);
    let profile = inputs.profile.as_ref();
    let (wave, score) = shape(base, &events, profile, date, assessment.confidence, &config.caffeine);

    let (mental, physical) = sub_scores(&terms);
    let (boosters, drainers) = event_lists(&events);
    let highlights = build_highlights(aggregate, &terms, profile, config);
    let debug = format!(
        "base={:.3} sleep={:.2} hrv={:.2} rhr={:.2} deep_rem={:.2} activity={:.2} history_days={}",
        base, terms.sleep, terms.hrv, terms.inv_resting_hr, terms.deep_rem, terms.activity,
        history_len
    );

    DayEnergySummary {
        date,
        overall_score: score,
        mental_score: mental,
        physical_score: physical,
        sleep_efficiency_pct: aggregate.sleep_efficiency_pct,
        coverage: cov,
        confidence: assessment.confidence,
        warning: assessment.warning,
        debug,
        hourly_waveform: wave.to_vec(),
        boosters,
        drainers,
        highlights,
    }
}

/// Summary presenting a cached or freshly computed forecast.
///
/// Sub-scores collapse onto the overall score since a forecast carries no
/// per-term breakdown.
pub fn summary_from_forecast(forecast: &DayEnergyForecast, inputs: &DayInputs) -> DayEnergySummary {
    let aggregate = inputs.aggregate_for(forecast.date);
    let cov = aggregate
        .map(|agg| coverage(agg.available.len()))
        .unwrap_or(0.0);
    let events = inputs.events_for(forecast.date);
    let (boosters, drainers) = event_lists(&events);
    let score = waveform_score(&forecast.hourly_waveform);
    let warning = match forecast.source {
        ForecastSource::DefaultHeuristic => Some(LIMITED_METRICS_WARNING.to_string()),
        ForecastSource::HistoricalModel => None,
    };

    DayEnergySummary {
        date: forecast.date,
        overall_score: score,
        mental_score: score,
        physical_score: score,
        sleep_efficiency_pct: aggregate.and_then(|agg| agg.sleep_efficiency_pct),
        coverage: cov,
        confidence: forecast.confidence,
        warning,
        debug: forecast.debug.clone().unwrap_or_default(),
        hourly_waveform: forecast.hourly_waveform.clone(),
        boosters,
        drainers,
        highlights: Vec::new(),
    }
}

fn sub_scores(terms: &EnergyTerms) -> (f64, f64) {
    let (sleep_w, hrv_w, deep_rem_w) = MENTAL_WEIGHTS;
    let mental = (sleep_w * terms.sleep + hrv_w * terms.hrv + deep_rem_w * terms.deep_rem)
        .clamp(0.0, 1.0)
        * 100.0;

    let (activity_w, rhr_w, sleep_w) = PHYSICAL_WEIGHTS;
    let physical = (activity_w * terms.activity
        + rhr_w * terms.inv_resting_hr
        + sleep_w * terms.sleep)
        .clamp(0.0, 1.0)
        * 100.0;

    (mental, physical)
}

fn event_lists(events: &[&ScheduleEvent]) -> (Vec<String>, Vec<String>) {
    let mut boosters: Vec<(&str, f64)> = Vec::new();
    let mut drainers: Vec<(&str, f64)> = Vec::new();
    for event in events {
        match event.energy_delta {
            Some(delta) if delta > 0.0 => boosters.push((&event.title, delta)),
            Some(delta) if delta < 0.0 => drainers.push((&event.title, delta)),
            _ => {}
        }
    }
    boosters.sort_by(|a, b| b.1.total_cmp(&a.1));
    drainers.sort_by(|a, b| a.1.total_cmp(&b.1));
    (
        boosters.into_iter().map(|(t, _)| t.to_string()).collect(),
        drainers.into_iter().map(|(t, _)| t.to_string()).collect(),
    )
}

fn build_highlights(
    aggregate: &BiometricDayAggregate,
    terms: &EnergyTerms,
    profile: Option<&UserProfile>,
    config: &EngineConfig,
) -> Vec<String> {
    let mut highlights = Vec::new();

    if let Some(efficiency) = aggregate.sleep_efficiency_pct {
        if efficiency >= 90.0 {
            highlights.push(format!(
                "Sleep efficiency of {:.0}% supported strong recovery",
                efficiency
            ));
        } else if efficiency < 75.0 {
            highlights.push(format!(
                "Sleep efficiency of {:.0}% was below the restorative range",
                efficiency
            ));
        }
    }

    if aggregate.hrv_ms.is_some() {
        if terms.hrv >= 0.7 {
            highlights.push("HRV was well above the typical range".to_string());
        } else if terms.hrv <= 0.25 {
            highlights.push("Suppressed HRV suggests elevated stress".to_string());
        }
    }

    if aggregate.resting_hr.is_some() && terms.inv_resting_hr <= 0.3 {
        highlights.push("Elevated resting heart rate overnight".to_string());
    }

    if let Some(steps) = aggregate.step_count {
        if terms.activity >= 0.9 {
            highlights.push("Activity was right around the typical daily volume".to_string());
        } else if terms.activity <= 0.2 {
            if steps < ACTIVITY_MEAN_STEPS {
                highlights.push("Low movement tends to lower energy through the day".to_string());
            } else {
                highlights
                    .push("Unusually high activity load may drain energy later".to_string());
            }
        }
    }

    if let Some(profile) = profile {
        if profile.caffeine_mg_per_day.unwrap_or(0.0) > config.caffeine.threshold_mg {
            highlights.push("High caffeine intake can cause a late-day dip".to_string());
        }
    }

    highlights.truncate(MAX_HIGHLIGHTS);
    highlights
}

/// Replace any waveform that is neither 24 entries nor the empty sentinel.
///
/// Downstream consumers never length-check; a malformed upstream result is
/// swapped wholesale for a flat neutral curve.
pub fn ensure_waveform_shape(summary: DayEnergySummary) -> DayEnergySummary {
    let len = summary.hourly_waveform.len();
    if len == WAVEFORM_LEN || len == 0 {
        return summary;
    }
    warn!(date = %summary.date, len, "replacing malformed waveform with neutral curve");
    summary.with_waveform(vec![0.5; WAVEFORM_LEN])
}

/// Top-level entry point routing a requested date to the correct blend of
/// measured, forecast, and cached data
pub struct SummaryProvider {
    repo: Arc<dyn ForecastRepository>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl SummaryProvider {
    pub fn new(
        repo: Arc<dyn ForecastRepository>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        SummaryProvider {
            repo,
            clock,
            config,
        }
    }

    /// Summary for a date from materialized input snapshots.
    ///
    /// Always returns a summary whose waveform is either 24 entries or the
    /// empty ineligible-day sentinel.
    pub fn summary(
        &self,
        date: NaiveDate,
        inputs: &DayInputs,
    ) -> Result<DayEnergySummary, CacheError> {
        if self.config.simulated_mode
            && inputs.aggregate_for(date).map_or(true, |agg| !agg.has_samples)
        {
            debug!(date = %date, "simulated mode with no samples, returning placeholder");
            return Ok(DayEnergySummary::neutral_placeholder(date));
        }

        let now = self.clock.now();
        let today = now.date();
        let blender = UnifiedBlender::new(self.repo.as_ref(), &self.config);

        let summary = if date < today {
            self.past_summary(&blender, date, inputs, now)?
        } else {
            blender.summarize(date, inputs, now)?
        };
        Ok(ensure_waveform_shape(summary))
    }

    /// Past-day policy: serve realized truth straight from the cache,
    /// enforcing the type-tagged invalidation rules first. Entries still
    /// holding an ahead-of-time forecast fall through to the blender so
    /// measured data can override them and accuracy can be recorded.
    fn past_summary(
        &self,
        blender: &UnifiedBlender<'_>,
        date: NaiveDate,
        inputs: &DayInputs,
        now: NaiveDateTime,
    ) -> Result<DayEnergySummary, CacheError> {
        if let Some(cached) = self.repo.get(date)? {
            let eligible = inputs.aggregate_for(date).map_or(false, is_eligible);
            let stale_historical =
                cached.source == ForecastSource::HistoricalModel && !eligible;
            let stale_heuristic = cached.source == ForecastSource::DefaultHeuristic
                && !cached.hourly_waveform.is_empty()
                && eligible;

            if stale_historical || stale_heuristic {
                info!(date = %date, source = %cached.source, "invalidating stale cached forecast");
                self.repo.invalidate(date)?;
            } else if is_realized(&cached) && cached.hourly_waveform.len() == WAVEFORM_LEN {
                debug!(date = %date, "serving past day from realized cache entry");
                return Ok(summary_from_forecast(&cached, inputs));
            }
        }
        blender.summarize(date, inputs, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryForecastRepository;
    use crate::clock::FixedClock;
    use crate::confidence::INSUFFICIENT_DATA_WARNING;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn full_day(d: NaiveDate) -> BiometricDayAggregate {
        let mut agg = BiometricDayAggregate::empty(d);
        agg.hrv_ms = Some(70.0);
        agg.resting_hr = Some(55.0);
        agg.avg_hr = Some(68.0);
        agg.sleep_efficiency_pct = Some(92.0);
        agg.deep_sleep_min = Some(100.0);
        agg.rem_sleep_min = Some(100.0);
        agg.time_in_bed_min = Some(450.0);
        agg.step_count = Some(8000.0);
        agg.active_energy_kcal = Some(520.0);
        agg.with_derived_availability()
    }

    fn noon(d: NaiveDate) -> NaiveDateTime {
        d.and_hms_opt(12, 0, 0).unwrap()
    }

    fn provider(now: NaiveDateTime) -> SummaryProvider {
        SummaryProvider::new(
            Arc::new(InMemoryForecastRepository::new()),
            Arc::new(FixedClock(now)),
            EngineConfig::default(),
        )
    }

    #[test]
    fn test_measured_summary_eligible_day() {
        let inputs = DayInputs {
            biometrics: vec![full_day(date(10))],
            ..DayInputs::default()
        };
        let summary = measured_summary(date(10), &inputs, &EngineConfig::default(), noon(date(11)));

        assert_eq!(summary.hourly_waveform.len(), WAVEFORM_LEN);
        assert!(summary.overall_score > 0.0);
        assert!((summary.coverage - 0.9).abs() < 1e-9);
        assert_eq!(summary.sleep_efficiency_pct, Some(92.0));
        assert!(summary.warning.is_none());
        // Rich metric set lifts confidence even with no history
        assert_eq!(summary.confidence, 0.8);
        assert!(!summary.highlights.is_empty());
    }

    #[test]
    fn test_measured_summary_no_data_sentinel() {
        let inputs = DayInputs::default();
        let summary = measured_summary(date(10), &inputs, &EngineConfig::default(), noon(date(11)));

        assert_eq!(summary.overall_score, 0.0);
        assert_eq!(summary.confidence, 0.0);
        assert_eq!(summary.warning.as_deref(), Some(INSUFFICIENT_DATA_WARNING));
        assert!(summary.hourly_waveform.is_empty());
    }

    #[test]
    fn test_measured_summary_missing_required_sentinel() {
        let mut agg = full_day(date(10));
        agg.time_in_bed_min = None;
        agg.avg_hr = None;
        let agg = agg.with_derived_availability();
        let inputs = DayInputs {
            biometrics: vec![agg],
            ..DayInputs::default()
        };
        let summary = measured_summary(date(10), &inputs, &EngineConfig::default(), noon(date(11)));

        assert!(summary.hourly_waveform.is_empty());
        assert!(summary.debug.contains("average heart rate"));
        assert!(summary.debug.contains("time in bed"));
        assert!(summary.coverage > 0.0);
    }

    #[test]
    fn test_overall_score_matches_waveform() {
        let inputs = DayInputs {
            biometrics: vec![full_day(date(10))],
            ..DayInputs::default()
        };
        let summary = measured_summary(date(10), &inputs, &EngineConfig::default(), noon(date(11)));
        assert!((summary.overall_score - waveform_score(&summary.hourly_waveform)).abs() < 1e-9);
    }

    #[test]
    fn test_event_lists_sorted_by_magnitude() {
        let d = date(10);
        let at = |hour: u32| d.and_hms_opt(hour, 0, 0).unwrap();
        let events = vec![
            ScheduleEvent::new("Walk", at(9), at(10), false, Some(0.2)),
            ScheduleEvent::new("Gym", at(17), at(18), false, Some(0.6)),
            ScheduleEvent::new("Standup", at(10), at(11), false, Some(-0.1)),
            ScheduleEvent::new("Review", at(14), at(16), false, Some(-0.5)),
            ScheduleEvent::new("Lunch", at(12), at(13), false, None),
        ];
        let refs: Vec<&ScheduleEvent> = events.iter().collect();
        let (boosters, drainers) = event_lists(&refs);

        assert_eq!(boosters, vec!["Gym".to_string(), "Walk".to_string()]);
        assert_eq!(drainers, vec!["Review".to_string(), "Standup".to_string()]);
    }

    #[test]
    fn test_ensure_waveform_shape() {
        let good = DayEnergySummary::neutral_placeholder(date(10));
        assert_eq!(ensure_waveform_shape(good.clone()), good);

        let sentinel = DayEnergySummary::insufficient(date(10), 0.0, String::new());
        assert!(ensure_waveform_shape(sentinel).hourly_waveform.is_empty());

        let malformed = good.with_waveform(vec![0.9; 12]);
        let fixed = ensure_waveform_shape(malformed);
        assert_eq!(fixed.hourly_waveform, vec![0.5; WAVEFORM_LEN]);
        assert!((fixed.overall_score - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_simulated_mode_placeholder() {
        let now = noon(date(10));
        let mut config = EngineConfig::default();
        config.simulated_mode = true;
        let provider = SummaryProvider::new(
            Arc::new(InMemoryForecastRepository::new()),
            Arc::new(FixedClock(now)),
            config,
        );

        let summary = provider.summary(date(10), &DayInputs::default()).unwrap();
        assert_eq!(summary.overall_score, 50.0);
        assert_eq!(summary.hourly_waveform, vec![0.5; WAVEFORM_LEN]);
        assert!(summary.boosters.is_empty());
    }

    #[test]
    fn test_provider_idempotent_for_identical_inputs() {
        let now = noon(date(15));
        let inputs = DayInputs {
            biometrics: (8..=14).map(|d| full_day(date(d))).collect(),
            ..DayInputs::default()
        };

        let provider = provider(now);
        let first = provider.summary(date(16), &inputs).unwrap();
        let second = provider.summary(date(16), &inputs).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_past_day_served_from_cache() {
        let now = noon(date(15));
        let provider = provider(now);
        let inputs = DayInputs {
            biometrics: vec![full_day(date(10))],
            ..DayInputs::default()
        };

        let first = provider.summary(date(10), &inputs).unwrap();
        // Second request is served from the realized cache entry
        let second = provider.summary(date(10), &inputs).unwrap();
        assert_eq!(first.hourly_waveform, second.hourly_waveform);
        assert!((second.overall_score - first.overall_score).abs() < 1e-9);
    }

    #[test]
    fn test_stale_historical_entry_invalidated() {
        let now = noon(date(15));
        let repo = Arc::new(InMemoryForecastRepository::new());
        let provider = SummaryProvider::new(
            repo.clone(),
            Arc::new(FixedClock(now)),
            EngineConfig::default(),
        );

        // Historical-model entry cached for a day that has no eligible data
        repo.put(&DayEnergyForecast {
            date: date(10),
            hourly_waveform: vec![0.7; WAVEFORM_LEN],
            score: 70.0,
            confidence: 0.8,
            missing_metrics: Vec::new(),
            source: ForecastSource::HistoricalModel,
            debug: None,
        })
        .unwrap();

        let summary = provider.summary(date(10), &DayInputs::default()).unwrap();
        assert!(summary.hourly_waveform.is_empty());
        assert!(repo.get(date(10)).unwrap().is_none());
    }

    #[test]
    fn test_stale_heuristic_entry_recomputed() {
        let now = noon(date(15));
        let repo = Arc::new(InMemoryForecastRepository::new());
        let provider = SummaryProvider::new(
            repo.clone(),
            Arc::new(FixedClock(now)),
            EngineConfig::default(),
        );

        repo.put(&DayEnergyForecast {
            date: date(10),
            hourly_waveform: vec![0.5; WAVEFORM_LEN],
            score: 50.0,
            confidence: 0.2,
            missing_metrics: Vec::new(),
            source: ForecastSource::DefaultHeuristic,
            debug: None,
        })
        .unwrap();

        // The day has since become eligible: heuristic entry must be replaced
        let inputs = DayInputs {
            biometrics: vec![full_day(date(10))],
            ..DayInputs::default()
        };
        let summary = provider.summary(date(10), &inputs).unwrap();
        assert!(summary.warning.is_none());

        let cached = repo.get(date(10)).unwrap().unwrap();
        assert_eq!(cached.source, ForecastSource::HistoricalModel);
        assert_eq!(cached.hourly_waveform, summary.hourly_waveform);
    }
}
