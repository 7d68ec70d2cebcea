//! Error types for the appendix subsystem.

use spa_io::IoError;
use thiserror::Error;

/// Errors surfaced by appendix parsing, validation, and application.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpaError {
    /// Permanent: the appendix is malformed, exceeds a hard limit, or
    /// violates a structural invariant. The enclosing transaction is
    /// rejected.
    #[error("{0}")]
    NotValid(String),

    /// Transient: the appendix is well-formed but inconsistent with the
    /// current chain state. Callers may retry after chain progress.
    #[error("{0}")]
    NotCurrentlyValid(String),

    /// A draft appendix was serialized or applied before being sealed.
    /// This is a programmer error, not a consensus condition.
    #[error("{0}")]
    NotYetEncrypted(&'static str),
}

impl SpaError {
    /// Create a permanent validation error.
    pub fn not_valid<S: Into<String>>(message: S) -> Self {
        Self::NotValid(message.into())
    }

    /// Create a transient validation error.
    pub fn not_currently_valid<S: Into<String>>(message: S) -> Self {
        Self::NotCurrentlyValid(message.into())
    }
}

// A short or malformed read is a malformed appendix.
impl From<IoError> for SpaError {
    fn from(error: IoError) -> Self {
        SpaError::NotValid(error.to_string())
    }
}

/// Result type for appendix operations.
pub type SpaResult<T> = std::result::Result<T, SpaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_becomes_not_valid() {
        let err: SpaError = IoError::end_of_stream(32, "public key").into();
        assert!(matches!(err, SpaError::NotValid(_)));
    }

    #[test]
    fn test_display_carries_message() {
        let err = SpaError::not_valid("Invalid arbitrary message length: 1001");
        assert_eq!(err.to_string(), "Invalid arbitrary message length: 1001");
    }
}
