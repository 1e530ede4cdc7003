//! Processing errors

use globetrotter_core::AppError;

/// Errors raised by decoding, transforming and encoding images.
///
/// EXIF problems never surface here: a broken EXIF block only drops the
/// `exif` field from [`crate::ImageMetadata`].
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to encode {format}: {message}")]
    Encode {
        format: &'static str,
        message: String,
    },

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Processing task failed: {0}")]
    Task(String),
}

impl ProcessingError {
    pub(crate) fn decode(err: impl std::fmt::Display) -> Self {
        ProcessingError::Decode(err.to_string())
    }

    pub(crate) fn encode(format: &'static str, err: impl std::fmt::Display) -> Self {
        ProcessingError::Encode {
            format,
            message: err.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for ProcessingError {
    fn from(err: tokio::task::JoinError) -> Self {
        ProcessingError::Task(err.to_string())
    }
}

impl From<ProcessingError> for AppError {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::UnsupportedFormat(format) => AppError::UnsupportedFormat(format),
            ProcessingError::InvalidOptions(message) => AppError::InvalidInput(message),
            ProcessingError::Io(e) => AppError::from(e),
            ProcessingError::Task(message) => AppError::Internal(message),
            other => AppError::ImageProcessing(other.to_string()),
        }
    }
}
