use fpid_core::CoreError;
use thiserror::Error;

/// Which side of a comparison a descriptor came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorSet {
    Probe,
    Candidate,
}

impl std::fmt::Display for DescriptorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DescriptorSet::Probe => write!(f, "probe"),
            DescriptorSet::Candidate => write!(f, "candidate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    #[error("{set} descriptor {index} has {found} elements, expected {expected}")]
    DimensionMismatch {
        set: DescriptorSet,
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("{set} descriptor {index} contains a non-finite value")]
    NonFiniteDescriptor { set: DescriptorSet, index: usize },
    #[error("invalid matcher configuration: {0}")]
    InvalidConfig(String),
}

impl From<CoreError> for MatchError {
    fn from(err: CoreError) -> Self {
        MatchError::InvalidConfig(err.to_string())
    }
}

pub type MatchResult<T> = Result<T, MatchError>;
