// Library interface for the energy engine modules
// This allows integration tests to access the core functionality

pub mod baseline;
pub mod blend;
pub mod cache;
pub mod clock;
pub mod confidence;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod import;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod summary;
pub mod waveform;

// Re-export commonly used types for convenience
pub use models::*;
pub use cache::{ForecastRepository, InMemoryForecastRepository, SqliteForecastRepository};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AppConfig, EngineConfig};
pub use error::{EnergyError, Result};
pub use logging::{LogFormat, LogLevel, LogSettings};
pub use summary::SummaryProvider;
