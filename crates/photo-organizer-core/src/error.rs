use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Custom error types for the photo-organizer library
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding error
    #[error("Image processing error: {0}")]
    Image(String),

    /// File or directory not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// A date typed by the user could not be parsed
    #[error("Invalid date '{0}', expected DD/MM/YYYY")]
    InvalidDateInput(String),

    /// An operation needs a period configuration and none was supplied
    #[error("Missing period configuration: {0}")]
    MissingConfiguration(String),

    /// A successor period was requested from a configuration without an end date
    #[error("Cannot derive the next period: the current period has no end date")]
    SuccessorUndefined,

    /// Invalid configuration error
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Manifest or config (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Image(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
