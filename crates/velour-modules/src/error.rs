//! Error types for module construction.

use std::collections::TryReserveError;
use thiserror::Error;

/// Errors that can occur while instantiating or configuring a module.
///
/// Nothing on the processing path returns this type; once a module exists,
/// every operation on it is infallible.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// No module is registered under the requested id
    #[error("unknown module: {0}")]
    UnknownModule(String),

    /// Delay or reverb memory could not be reserved
    #[error("failed to allocate {samples} samples for {what}: {source}")]
    Allocation {
        /// Buffer that was being allocated.
        what: &'static str,
        /// Requested size in samples.
        samples: usize,
        /// Underlying allocation error.
        #[source]
        source: TryReserveError,
    },

    /// An engine configuration value is out of range
    #[error("invalid engine config '{field}': {reason}")]
    InvalidConfig {
        /// Name of the offending field.
        field: &'static str,
        /// Description of why the value is invalid.
        reason: String,
    },
}

impl ModuleError {
    /// Create an allocation error.
    pub fn allocation(what: &'static str, samples: usize, source: TryReserveError) -> Self {
        ModuleError::Allocation {
            what,
            samples,
            source,
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        ModuleError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ModuleError::UnknownModule("chorus".to_string());
        assert_eq!(err.to_string(), "unknown module: chorus");

        let err = ModuleError::invalid_config("max_sample_rate", "must be at least 8000");
        assert_eq!(
            err.to_string(),
            "invalid engine config 'max_sample_rate': must be at least 8000"
        );
    }

    #[test]
    fn test_allocation_source_is_kept() {
        let mut v: Vec<f32> = Vec::new();
        let source = v.try_reserve_exact(usize::MAX).unwrap_err();
        let err = ModuleError::allocation("delay line", usize::MAX, source);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("delay line"));
    }
}
