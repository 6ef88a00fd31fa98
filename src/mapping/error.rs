//! Error definitions for the mapping module

use thiserror::Error;

use crate::controller::SourceError;

/// Error types for the mapping engine
///
/// The per-frame path never fails; these errors only come out of
/// configuration and engine lifecycle.
#[derive(Debug, Error)]
pub enum MappingError {
    /// Invalid mapper configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Engine could not be set up
    #[error("Initialization error: {0}")]
    InitializationError(String),

    /// Host input source failed
    #[error("Input source error: {0}")]
    SourceError(#[from] SourceError),

    /// Engine task ended abnormally
    #[error("Task error: {0}")]
    ThreadError(String),
}
