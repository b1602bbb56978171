//! Error types shared by every featurizer.
//!
//! Errors inside the crate are ordinary [`Result`] values. The ABI layer in
//! [`crate::ffi`] converts them into opaque error handles carrying the message and
//! the [`ErrorKind`] code.

use thiserror::Error;

/// Coarse classification reported across the ABI.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument = 1,
    InvalidState = 2,
    DecodeError = 3,
    AllocationFailure = 4,
}

/// Error type for estimator, transformer and archive operations.
#[derive(Error, Debug)]
pub enum FeaturizerError {
    /// Null or zero-length required argument, malformed record, bad configuration.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation not allowed in the current training or streaming state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Archive bytes could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// An output buffer could not be allocated.
    #[error("Allocation failure: {0}")]
    AllocationFailure(String),

    /// I/O error while reading or writing saved transformer files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FeaturizerError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        FeaturizerError::InvalidArgument(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        FeaturizerError::InvalidState(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        FeaturizerError::Decode(msg.into())
    }

    /// Kind reported to foreign callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FeaturizerError::InvalidArgument(_) | FeaturizerError::Io(_) => {
                ErrorKind::InvalidArgument
            }
            FeaturizerError::InvalidState(_) => ErrorKind::InvalidState,
            FeaturizerError::Decode(_) => ErrorKind::DecodeError,
            FeaturizerError::AllocationFailure(_) => ErrorKind::AllocationFailure,
        }
    }
}

impl From<std::collections::TryReserveError> for FeaturizerError {
    fn from(err: std::collections::TryReserveError) -> Self {
        FeaturizerError::AllocationFailure(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FeaturizerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_argument() {
        let err = FeaturizerError::invalid_argument("'grain' is null");
        assert!(err.to_string().contains("Invalid argument"));
        assert!(err.to_string().contains("'grain' is null"));
    }

    #[test]
    fn test_error_display_invalid_state() {
        let err = FeaturizerError::invalid_state("fit after training finished");
        assert!(err.to_string().contains("Invalid state"));
    }

    #[test]
    fn test_error_display_decode() {
        let err = FeaturizerError::decode("Invalid buffer");
        assert_eq!(err.to_string(), "Decode error: Invalid buffer");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            FeaturizerError::invalid_argument("x").kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            FeaturizerError::invalid_state("x").kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(FeaturizerError::decode("x").kind(), ErrorKind::DecodeError);
        assert_eq!(
            FeaturizerError::AllocationFailure("x".to_string()).kind(),
            ErrorKind::AllocationFailure
        );
    }

    #[test]
    fn test_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: FeaturizerError = io_err.into();
        assert!(matches!(err, FeaturizerError::Io(_)));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_error_from_try_reserve() {
        let mut v: Vec<u8> = Vec::new();
        let reserve_err = v.try_reserve_exact(usize::MAX).unwrap_err();
        let err: FeaturizerError = reserve_err.into();
        assert_eq!(err.kind(), ErrorKind::AllocationFailure);
    }

    #[test]
    fn test_error_is_std_error() {
        let err = FeaturizerError::invalid_argument("test");
        let _: &dyn std::error::Error = &err;
    }

    #[test]
    fn test_error_kind_codes() {
        assert_eq!(ErrorKind::InvalidArgument as u8, 1);
        assert_eq!(ErrorKind::AllocationFailure as u8, 4);
    }
}
