//! Error types for ttreco

use thiserror::Error;

/// ttreco error type
///
/// Physical failures (too few jets, no neutrino solution, values outside a likelihood table)
/// are not errors: they are reported through the reconstruction status. This type covers
/// configuration mistakes and contract violations by the caller.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// A reconstructed quantity was requested for an event that was not reconstructed
    #[error("Not reconstructed: {0}")]
    NotReconstructed(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
