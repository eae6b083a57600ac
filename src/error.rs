//! Error types for the tabwright library

use std::io;

/// Library error type for tabwright operations
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The input document is missing required structure or carries invalid values
    #[error("invalid input: {0}")]
    InputValidation(String),

    /// Parsing error when reading back Guitar Pro files
    #[error("parsing error: {0}")]
    Parsing(String),

    /// The model could not be encoded into the target file format
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),
}

impl ConvertError {
    /// Client errors are caused by the submitted document, everything else is on our side.
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::InputValidation(_))
    }
}

impl From<io::Error> for ConvertError {
    fn from(error: io::Error) -> Self {
        Self::Io(error.to_string())
    }
}
