//! Error types shared across the engine.
//!
//! Per-URL failures raised by an extractor are not fatal to a run: the engine
//! logs them, counts them in the run statistics and moves on. The variants
//! below are what callers see from the fallible public APIs.

use thiserror::Error;

/// The error type for `pagewalk-core`.
#[derive(Debug, Error)]
pub enum PagewalkError {
    /// The engine was configured with invalid settings.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A catch-all for failures that have no dedicated variant.
    #[error("General error: {0}")]
    GeneralError(String),

    /// An extractor failed to discover URLs or to produce an item.
    #[error(transparent)]
    Extractor(#[from] anyhow::Error),

    /// Statistics could not be serialized.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// An internal engine task panicked or was aborted.
    #[error("Engine task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

impl PagewalkError {
    /// Wraps an arbitrary message as an extractor failure.
    pub fn extractor(msg: impl std::fmt::Display) -> Self {
        PagewalkError::Extractor(anyhow::anyhow!("{}", msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anyhow_errors_convert_transparently() {
        fn fails() -> Result<(), PagewalkError> {
            Err(anyhow::anyhow!("listing page returned 503"))?;
            Ok(())
        }

        let err = fails().unwrap_err();
        assert!(matches!(err, PagewalkError::Extractor(_)));
        assert_eq!(err.to_string(), "listing page returned 503");
    }

    #[test]
    fn configuration_error_message() {
        let err = PagewalkError::ConfigurationError("bad limit".into());
        assert_eq!(err.to_string(), "Configuration error: bad limit");
    }
}
