//! Input file loading
//!
//! The engine core never fetches data itself; the CLI materializes a
//! [`DayInputs`] snapshot from files and hands it over. Biometric
//! aggregates and profiles arrive as JSON, schedule events as CSV.

use chrono::NaiveDateTime;
use csv::ReaderBuilder;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::models::{BiometricDayAggregate, DayInputs, ScheduleEvent, UserProfile};

/// Input loading errors
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON parse error in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("CSV parse error in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("Invalid timestamp '{value}' in {path} (expected YYYY-MM-DDTHH:MM:SS)")]
    InvalidTimestamp { path: PathBuf, value: String },
}

fn open(path: &Path) -> Result<BufReader<File>, ImportError> {
    if !path.exists() {
        return Err(ImportError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Load biometric day aggregates from a JSON array.
///
/// The availability set is rebuilt from the populated fields, so exports
/// that carry only raw values still classify correctly. Days come back
/// sorted oldest to newest regardless of file order.
pub fn load_biometrics(path: &Path) -> Result<Vec<BiometricDayAggregate>, ImportError> {
    let reader = open(path)?;
    let raw: Vec<BiometricDayAggregate> =
        serde_json::from_reader(reader).map_err(|source| ImportError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    let mut days: Vec<BiometricDayAggregate> = raw
        .into_iter()
        .map(BiometricDayAggregate::with_derived_availability)
        .collect();
    days.sort_by_key(|agg| agg.date);
    info!(count = days.len(), path = %path.display(), "loaded biometric days");
    Ok(days)
}

#[derive(Debug, Deserialize)]
struct EventRow {
    title: String,
    start: String,
    end: String,
    #[serde(default)]
    all_day: bool,
    #[serde(default)]
    energy_delta: Option<f64>,
}

fn parse_timestamp(value: &str, path: &Path) -> Result<NaiveDateTime, ImportError> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S"))
        .map_err(|_| ImportError::InvalidTimestamp {
            path: path.to_path_buf(),
            value: value.to_string(),
        })
}

/// Load schedule events from a CSV file.
///
/// Expected columns: `title,start,end,all_day,energy_delta`. Deltas are
/// clamped into [-1, +1] on construction.
pub fn load_events(path: &Path) -> Result<Vec<ScheduleEvent>, ImportError> {
    let reader = open(path)?;
    let mut csv_reader = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut events = Vec::new();
    for row in csv_reader.deserialize::<EventRow>() {
        let row = row.map_err(|source| ImportError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let start = parse_timestamp(&row.start, path)?;
        let end = parse_timestamp(&row.end, path)?;
        events.push(ScheduleEvent::new(
            row.title,
            start,
            end,
            row.all_day,
            row.energy_delta,
        ));
    }
    info!(count = events.len(), path = %path.display(), "loaded schedule events");
    Ok(events)
}

/// Load a user profile from a JSON file.
pub fn load_profile(path: &Path) -> Result<UserProfile, ImportError> {
    let reader = open(path)?;
    serde_json::from_reader(reader).map_err(|source| ImportError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Materialize a [`DayInputs`] snapshot from optional input files.
pub fn load_inputs(
    biometrics: Option<&Path>,
    events: Option<&Path>,
    profile: Option<&Path>,
) -> Result<DayInputs, ImportError> {
    Ok(DayInputs {
        biometrics: biometrics.map(load_biometrics).transpose()?.unwrap_or_default(),
        events: events.map(load_events).transpose()?.unwrap_or_default(),
        profile: profile.map(load_profile).transpose()?,
    })
}
