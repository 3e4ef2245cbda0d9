//! Unified blending of measured and forecast waveforms
//!
//! Routes a requested date relative to "today":
//!
//! - past days return measured data and record forecast accuracy; a
//!   forecast never overrides history
//! - future days return a pure forecast, cached for later accuracy
//!   measurement
//! - today blends measured hours into the forecast across a short
//!   transition window, so the curve has no visible discontinuity at the
//!   current hour
//!
//! In every branch the final overall score is recomputed from the final
//! waveform, never copied forward.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use tracing::debug;

use crate::baseline::{historical_baseline, NEUTRAL_ENERGY};
use crate::cache::{CacheError, ForecastRepository};
use crate::confidence::{history_confidence, CONFIDENCE_BASE};
use crate::config::EngineConfig;
use crate::eligibility::{missing_required, REQUIRED_METRICS};
use crate::models::{
    DayEnergyForecast, DayEnergySummary, DayInputs, ForecastSource, WAVEFORM_LEN,
};
use crate::summary::{measured_summary, summary_from_forecast};
use crate::waveform::shape;

/// Debug tag marking cache entries that hold realized (measured) truth for
/// an elapsed day rather than a genuine ahead-of-time forecast.
pub const REALIZED_DEBUG_TAG: &str = "realized";

/// True for cache entries holding realized truth rather than a forecast.
pub fn is_realized(forecast: &DayEnergyForecast) -> bool {
    forecast.debug.as_deref() == Some(REALIZED_DEBUG_TAG)
}

/// Per-hour blend of measured and forecast values for "today".
///
/// Hours before the current hour keep the measured value. Across the
/// transition window the value interpolates linearly from the measured
/// value at the blend start to the forecast value at the window end;
/// beyond the window the pure forecast applies.
pub fn blend_waveforms(
    measured: &[f64],
    forecast: &[f64],
    current_hour: usize,
    window: usize,
) -> Vec<f64> {
    let mut out = measured.to_vec();
    if measured.len() != WAVEFORM_LEN || forecast.len() != WAVEFORM_LEN {
        return out;
    }
    let window = window.max(1);
    let current_hour = current_hour.min(WAVEFORM_LEN - 1);
    let end = (current_hour + window).min(WAVEFORM_LEN - 1);

    let blend_start = measured[current_hour];
    let blend_end = forecast[end];
    for hour in current_hour..=end {
        let t = (hour - current_hour) as f64 / window as f64;
        out[hour] = blend_start + (blend_end - blend_start) * t;
    }
    for hour in end + 1..WAVEFORM_LEN {
        out[hour] = forecast[hour];
    }
    out
}

/// Forecast accuracy: `1 - mean(|forecast - measured|)`, clamped to [0, 1].
pub fn forecast_accuracy(forecast: &[f64], measured: &[f64]) -> f64 {
    if forecast.is_empty() || forecast.len() != measured.len() {
        return 0.0;
    }
    let mean_abs_diff = forecast
        .iter()
        .zip(measured)
        .map(|(f, m)| (f - m).abs())
        .sum::<f64>()
        / forecast.len() as f64;
    (1.0 - mean_abs_diff).clamp(0.0, 1.0)
}

/// Compute a forecast for a day from the history preceding it.
///
/// With a usable historical baseline the forecast is tagged
/// `HistoricalModel`; without one the shaper runs from the neutral
/// midpoint and the result is tagged `DefaultHeuristic` at floor
/// confidence.
pub fn forecast_for(
    date: NaiveDate,
    inputs: &DayInputs,
    config: &EngineConfig,
    now: NaiveDateTime,
) -> DayEnergyForecast {
    let history = inputs.history_before(date);
    let history_len = inputs.history_len(date);
    let events = inputs.events_for(date);
    let profile = inputs.profile.as_ref();

    match historical_baseline(&history, now) {
        Some(baseline) => {
            let confidence = history_confidence(history_len);
            let missing = history
                .last()
                .map(|latest| missing_required(latest))
                .unwrap_or_else(|| REQUIRED_METRICS.to_vec());
            let (wave, score) =
                shape(baseline, &events, profile, date, confidence, &config.caffeine);
            DayEnergyForecast {
                date,
                hourly_waveform: wave.to_vec(),
                score,
                confidence,
                missing_metrics: missing,
                source: ForecastSource::HistoricalModel,
                debug: Some(format!(
                    "baseline={:.3} history_days={}",
                    baseline, history_len
                )),
            }
        }
        None => {
            let (wave, score) = shape(
                NEUTRAL_ENERGY,
                &events,
                profile,
                date,
                CONFIDENCE_BASE,
                &config.caffeine,
            );
            DayEnergyForecast {
                date,
                hourly_waveform: wave.to_vec(),
                score,
                confidence: CONFIDENCE_BASE,
                missing_metrics: REQUIRED_METRICS.to_vec(),
                source: ForecastSource::DefaultHeuristic,
                debug: Some("no usable history".to_string()),
            }
        }
    }
}

fn realized_record(summary: &DayEnergySummary) -> DayEnergyForecast {
    DayEnergyForecast {
        date: summary.date,
        hourly_waveform: summary.hourly_waveform.clone(),
        score: summary.overall_score,
        confidence: summary.confidence,
        missing_metrics: Vec::new(),
        source: ForecastSource::HistoricalModel,
        debug: Some(REALIZED_DEBUG_TAG.to_string()),
    }
}

/// Date router combining measured summaries, forecasts, and the cache
pub struct UnifiedBlender<'a> {
    repo: &'a dyn ForecastRepository,
    config: &'a EngineConfig,
}

impl<'a> UnifiedBlender<'a> {
    pub fn new(repo: &'a dyn ForecastRepository, config: &'a EngineConfig) -> Self {
        UnifiedBlender { repo, config }
    }

    /// Summary for a date, routed by its relation to "today".
    pub fn summarize(
        &self,
        date: NaiveDate,
        inputs: &DayInputs,
        now: NaiveDateTime,
    ) -> Result<DayEnergySummary, CacheError> {
        let today = now.date();
        if date < today {
            self.past(date, inputs, now)
        } else if date > today {
            self.future(date, inputs, now)
        } else {
            self.today(date, inputs, now)
        }
    }

    fn past(
        &self,
        date: NaiveDate,
        inputs: &DayInputs,
        now: NaiveDateTime,
    ) -> Result<DayEnergySummary, CacheError> {
        let summary = measured_summary(date, inputs, self.config, now);
        if summary.hourly_waveform.is_empty() {
            // Ineligible day: nothing to persist or measure against
            return Ok(summary);
        }

        // Read-check-write per date key: accuracy is recorded exactly once,
        // against the forecast that existed before realization.
        if let Some(prior) = self.repo.get(date)? {
            if prior.source == ForecastSource::HistoricalModel
                && !is_realized(&prior)
                && prior.hourly_waveform.len() == WAVEFORM_LEN
                && self.repo.accuracy(date)?.is_none()
            {
                let accuracy = forecast_accuracy(&prior.hourly_waveform, &summary.hourly_waveform);
                debug!(date = %date, accuracy, "recording forecast accuracy");
                self.repo.record_accuracy(date, accuracy)?;
            }
        }

        self.repo.put(&realized_record(&summary))?;
        Ok(summary)
    }

    fn future(
        &self,
        date: NaiveDate,
        inputs: &DayInputs,
        now: NaiveDateTime,
    ) -> Result<DayEnergySummary, CacheError> {
        let forecast = forecast_for(date, inputs, self.config, now);
        debug!(date = %date, source = %forecast.source, "caching forecast");
        self.repo.put(&forecast)?;
        Ok(summary_from_forecast(&forecast, inputs))
    }

    fn today(
        &self,
        date: NaiveDate,
        inputs: &DayInputs,
        now: NaiveDateTime,
    ) -> Result<DayEnergySummary, CacheError> {
        let measured = measured_summary(date, inputs, self.config, now);
        let forecast = forecast_for(date, inputs, self.config, now);

        if measured.hourly_waveform.is_empty() {
            // Nothing measured yet today; show the pure forecast
            return Ok(summary_from_forecast(&forecast, inputs));
        }

        let current_hour = now.hour() as usize;
        let blended = blend_waveforms(
            &measured.hourly_waveform,
            &forecast.hourly_waveform,
            current_hour,
            self.config.blend_window_hours,
        );
        Ok(measured.with_waveform(blended))
    }
}
