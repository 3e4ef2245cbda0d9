//! Unified error hierarchy for the energy engine
//!
//! Library operations return structured errors; the CLI wraps them in
//! anyhow for display.

use thiserror::Error;

pub use crate::cache::CacheError;
pub use crate::import::ImportError;

/// Top-level error type for engine operations
#[derive(Debug, Error)]
pub enum EnergyError {
    /// Forecast cache errors
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Input file loading errors
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias using the engine error type
pub type Result<T> = std::result::Result<T, EnergyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EnergyError::Configuration("bad blend window".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad blend window");
    }

    #[test]
    fn test_cache_error_conversion() {
        let err: EnergyError = CacheError::Poisoned.into();
        assert!(matches!(err, EnergyError::Cache(_)));
    }
}
