use fpid_core::CoreError;
use fpid_fast::FastError;
use fpid_match::MatchError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractError {
    #[error("invalid image: {width}x{height}")]
    InvalidImage { width: usize, height: usize },
    #[error("keypoint detection failed: {0}")]
    Detection(#[from] FastError),
    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type ExtractResult<T> = Result<T, ExtractError>;

/// A gallery entry or probe that could not be turned into an image
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to decode {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("gallery index {index} out of range (len {len})")]
    OutOfRange { index: usize, len: usize },
    #[error("failed to read gallery directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Core(#[from] CoreError),
}

#[derive(Debug, Error)]
pub enum IdentifyError {
    #[error("invalid probe: {0}")]
    InvalidProbe(String),
    #[error("decode failed: {0}")]
    DecodeFailed(#[from] DecodeError),
    #[error("invalid image: {0}")]
    InvalidImage(#[from] ExtractError),
    #[error("match computation failed: {0}")]
    MatchComputationFailed(#[from] MatchError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl From<CoreError> for IdentifyError {
    fn from(err: CoreError) -> Self {
        IdentifyError::Config(err.to_string())
    }
}

pub type IdentifyResult<T> = Result<T, IdentifyError>;
