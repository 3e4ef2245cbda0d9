//! Forecast cache
//!
//! A date-keyed store of computed forecasts plus a parallel accuracy map.
//! The store itself is deliberately dumb: all consistency policy (source
//! tag invalidation, accuracy bookkeeping) lives in the unified blender
//! and summary provider. Two implementations are provided: a
//! Mutex-guarded in-memory map and a SQLite-backed repository for on-disk
//! persistence.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use crate::models::DayEnergyForecast;

/// Cache store errors
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Cache lock poisoned")]
    Poisoned,
}

/// Date-keyed forecast store
///
/// Injected into the summary provider and unified blender so cache
/// behavior is independently testable against the in-memory fake.
pub trait ForecastRepository: Send + Sync {
    /// Point lookup of the forecast stored for a date.
    fn get(&self, date: NaiveDate) -> Result<Option<DayEnergyForecast>, CacheError>;

    /// Insert or overwrite the forecast for its date.
    fn put(&self, forecast: &DayEnergyForecast) -> Result<(), CacheError>;

    /// Remove the forecast stored for a date, if any.
    fn invalidate(&self, date: NaiveDate) -> Result<(), CacheError>;

    /// Record a 0-1 accuracy measurement for a date.
    fn record_accuracy(&self, date: NaiveDate, accuracy: f64) -> Result<(), CacheError>;

    /// Point lookup of the accuracy recorded for a date.
    fn accuracy(&self, date: NaiveDate) -> Result<Option<f64>, CacheError>;

    /// Accuracy measurements in an inclusive date range, oldest first.
    fn accuracy_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>, CacheError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    forecasts: BTreeMap<NaiveDate, DayEnergyForecast>,
    accuracy: BTreeMap<NaiveDate, f64>,
}

/// In-memory repository behind a single global lock
///
/// Concurrent summary requests may read and write overlapping date keys;
/// one lock around all mutation keeps read-check-write sequences atomic.
#[derive(Debug, Default)]
pub struct InMemoryForecastRepository {
    state: Mutex<MemoryState>,
}

impl InMemoryForecastRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ForecastRepository for InMemoryForecastRepository {
    fn get(&self, date: NaiveDate) -> Result<Option<DayEnergyForecast>, CacheError> {
        let state = self.state.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(state.forecasts.get(&date).cloned())
    }

    fn put(&self, forecast: &DayEnergyForecast) -> Result<(), CacheError> {
        let mut state = self.state.lock().map_err(|_| CacheError::Poisoned)?;
        state.forecasts.insert(forecast.date, forecast.clone());
        Ok(())
    }

    fn invalidate(&self, date: NaiveDate) -> Result<(), CacheError> {
        let mut state = self.state.lock().map_err(|_| CacheError::Poisoned)?;
        state.forecasts.remove(&date);
        Ok(())
    }

    fn record_accuracy(&self, date: NaiveDate, accuracy: f64) -> Result<(), CacheError> {
        let mut state = self.state.lock().map_err(|_| CacheError::Poisoned)?;
        state.accuracy.insert(date, accuracy.clamp(0.0, 1.0));
        Ok(())
    }

    fn accuracy(&self, date: NaiveDate) -> Result<Option<f64>, CacheError> {
        let state = self.state.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(state.accuracy.get(&date).copied())
    }

    fn accuracy_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>, CacheError> {
        let state = self.state.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(state
            .accuracy
            .range(from..=to)
            .map(|(date, acc)| (*date, *acc))
            .collect())
    }
}

/// SQLite-backed repository
///
/// One row per date in each of two tables; forecasts are stored as JSON
/// payloads. WAL mode keeps concurrent readers cheap while the connection
/// mutex serializes writes.
pub struct SqliteForecastRepository {
    conn: Mutex<Connection>,
}

impl SqliteForecastRepository {
    /// Create or open a repository at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        let conn = Connection::open(path)?;
        let repo = SqliteForecastRepository {
            conn: Mutex::new(conn),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    /// In-memory SQLite database, handy for tests.
    pub fn in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        let repo = SqliteForecastRepository {
            conn: Mutex::new(conn),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    fn init_schema(&self) -> Result<(), CacheError> {
        let conn = self.conn.lock().map_err(|_| CacheError::Poisoned)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS forecasts (
                date TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS forecast_accuracy (
                date TEXT PRIMARY KEY,
                accuracy REAL NOT NULL,
                recorded_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;
        Ok(())
    }
}

impl ForecastRepository for SqliteForecastRepository {
    fn get(&self, date: NaiveDate) -> Result<Option<DayEnergyForecast>, CacheError> {
        let conn = self.conn.lock().map_err(|_| CacheError::Poisoned)?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM forecasts WHERE date = ?1",
                params![date.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn put(&self, forecast: &DayEnergyForecast) -> Result<(), CacheError> {
        let payload = serde_json::to_string(forecast)?;
        let conn = self.conn.lock().map_err(|_| CacheError::Poisoned)?;
        conn.execute(
            "INSERT OR REPLACE INTO forecasts (date, payload) VALUES (?1, ?2)",
            params![forecast.date.to_string(), payload],
        )?;
        Ok(())
    }

    fn invalidate(&self, date: NaiveDate) -> Result<(), CacheError> {
        let conn = self.conn.lock().map_err(|_| CacheError::Poisoned)?;
        conn.execute(
            "DELETE FROM forecasts WHERE date = ?1",
            params![date.to_string()],
        )?;
        Ok(())
    }

    fn record_accuracy(&self, date: NaiveDate, accuracy: f64) -> Result<(), CacheError> {
        let conn = self.conn.lock().map_err(|_| CacheError::Poisoned)?;
        conn.execute(
            "INSERT OR REPLACE INTO forecast_accuracy (date, accuracy) VALUES (?1, ?2)",
            params![date.to_string(), accuracy.clamp(0.0, 1.0)],
        )?;
        Ok(())
    }

    fn accuracy(&self, date: NaiveDate) -> Result<Option<f64>, CacheError> {
        let conn = self.conn.lock().map_err(|_| CacheError::Poisoned)?;
        let value = conn
            .query_row(
                "SELECT accuracy FROM forecast_accuracy WHERE date = ?1",
                params![date.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn accuracy_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>, CacheError> {
        let conn = self.conn.lock().map_err(|_| CacheError::Poisoned)?;
        let mut stmt = conn.prepare(
            "SELECT date, accuracy FROM forecast_accuracy
             WHERE date >= ?1 AND date <= ?2 ORDER BY date",
        )?;
        let rows = stmt.query_map(params![from.to_string(), to.to_string()], |row| {
            let date: String = row.get(0)?;
            let accuracy: f64 = row.get(1)?;
            Ok((date, accuracy))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (date, accuracy) = row?;
            if let Ok(date) = date.parse::<NaiveDate>() {
                out.push((date, accuracy));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ForecastSource;

    fn forecast(date: NaiveDate) -> DayEnergyForecast {
        DayEnergyForecast {
            date,
            hourly_waveform: vec![0.5; 24],
            score: 50.0,
            confidence: 0.8,
            missing_metrics: Vec::new(),
            source: ForecastSource::HistoricalModel,
            debug: Some("test".to_string()),
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn exercise_repo(repo: &dyn ForecastRepository) {
        let d = date(10);
        assert!(repo.get(d).unwrap().is_none());

        let f = forecast(d);
        repo.put(&f).unwrap();
        assert_eq!(repo.get(d).unwrap(), Some(f.clone()));

        // Overwrite replaces the record
        let mut updated = f.clone();
        updated.score = 62.0;
        repo.put(&updated).unwrap();
        assert_eq!(repo.get(d).unwrap().unwrap().score, 62.0);

        repo.invalidate(d).unwrap();
        assert!(repo.get(d).unwrap().is_none());

        assert!(repo.accuracy(d).unwrap().is_none());
        repo.record_accuracy(d, 0.91).unwrap();
        repo.record_accuracy(date(11), 0.85).unwrap();
        repo.record_accuracy(date(20), 0.7).unwrap();
        assert_eq!(repo.accuracy(d).unwrap(), Some(0.91));

        let range = repo.accuracy_range(date(10), date(15)).unwrap();
        assert_eq!(range, vec![(date(10), 0.91), (date(11), 0.85)]);

        // Out-of-range accuracy values are clamped
        repo.record_accuracy(date(12), 1.4).unwrap();
        assert_eq!(repo.accuracy(date(12)).unwrap(), Some(1.0));
    }

    #[test]
    fn test_in_memory_repository() {
        exercise_repo(&InMemoryForecastRepository::new());
    }

    #[test]
    fn test_sqlite_repository_in_memory() {
        exercise_repo(&SqliteForecastRepository::in_memory().unwrap());
    }

    #[test]
    fn test_sqlite_repository_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forecasts.db");

        {
            let repo = SqliteForecastRepository::new(&path).unwrap();
            repo.put(&forecast(date(10))).unwrap();
            repo.record_accuracy(date(10), 0.88).unwrap();
        }

        let repo = SqliteForecastRepository::new(&path).unwrap();
        assert!(repo.get(date(10)).unwrap().is_some());
        assert_eq!(repo.accuracy(date(10)).unwrap(), Some(0.88));
    }
}
