use fpid_core::CoreError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FastError {
    #[error("invalid image dimensions: {width}x{height} (must be > 0)")]
    InvalidImageSize { width: usize, height: usize },
    #[error("invalid detector configuration: {0}")]
    InvalidConfig(String),
}

impl From<CoreError> for FastError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidConfig(msg) => FastError::InvalidConfig(msg),
            other => FastError::InvalidConfig(other.to_string()),
        }
    }
}

pub type FastResult<T> = Result<T, FastError>;
