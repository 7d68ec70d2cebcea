//! Error types for the Spa I/O crate.

use thiserror::Error;

/// Errors raised by the positional binary codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IoError {
    /// A read ran past the end of the buffer.
    #[error("Unexpected end of stream: expected {expected} more bytes while reading {context}")]
    EndOfStream { expected: usize, context: String },

    /// The bytes were present but their content is unusable.
    #[error("Invalid data: {context}, value: {value}")]
    InvalidData { context: String, value: String },

    /// Text bytes failed to decode.
    #[error("Encoding error: {encoding}, reason: {reason}")]
    Encoding { encoding: String, reason: String },
}

impl IoError {
    /// Create a new end of stream error.
    pub fn end_of_stream<S: Into<String>>(expected: usize, context: S) -> Self {
        Self::EndOfStream {
            expected,
            context: context.into(),
        }
    }

    /// Create a new invalid data error.
    pub fn invalid_data<S: Into<String>>(context: S, value: S) -> Self {
        Self::InvalidData {
            context: context.into(),
            value: value.into(),
        }
    }

    /// Create a new encoding error.
    pub fn encoding<S: Into<String>>(encoding: S, reason: S) -> Self {
        Self::Encoding {
            encoding: encoding.into(),
            reason: reason.into(),
        }
    }
}

impl From<std::string::FromUtf8Error> for IoError {
    fn from(error: std::string::FromUtf8Error) -> Self {
        IoError::encoding("utf8", &error.to_string())
    }
}

impl From<std::str::Utf8Error> for IoError {
    fn from(error: std::str::Utf8Error) -> Self {
        IoError::encoding("utf8", &error.to_string())
    }
}

impl From<std::array::TryFromSliceError> for IoError {
    fn from(error: std::array::TryFromSliceError) -> Self {
        IoError::invalid_data("slice length", &error.to_string())
    }
}

/// Result type for I/O operations.
pub type IoResult<T> = std::result::Result<T, IoError>;
