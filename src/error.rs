//! Error types for the pose retargeting library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Perspective-n-Point solve failed or did not converge
    #[error("Pose solve error: {0}")]
    PoseSolve(String),

    /// Filter initialization or processing error
    #[error("Filter error: {0}")]
    FilterError(String),

    /// A configured joint does not exist on the skeleton
    #[error("Missing joint: '{0}' is not part of the skeleton")]
    MissingJoint(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Landmark acquisition from the perception source failed
    #[error("Acquisition error: {0}")]
    Acquisition(String),

    /// Generic I/O error with description
    #[error("I/O error: {0}")]
    IoError(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the error must abort setup rather than degrade tracking.
    ///
    /// Per-frame problems (a failed solve, an unusable input sample) only
    /// cost the current frame; the frame loop drops them and goes on.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::PoseSolve(_) | Self::InvalidInput(_))
    }
}
