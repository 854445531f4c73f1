use explainer::core::ExplanationError;
use thiserror::Error;

use crate::gcnf::GcnfParseError;

pub(crate) type ExplainerResult<T> = Result<T, ExplainerError>;

#[derive(Error, Debug)]
pub(crate) enum ExplainerError {
    #[error("IO error, more details: {0}")]
    IOError(#[from] std::io::Error),
    #[error("The instance file was invalid, more details: {0}")]
    InvalidInstance(#[from] GcnfParseError),
    #[error("Failed to explain the instance, more details: {0}")]
    Explanation(#[from] ExplanationError),
    #[error("Expected {expected} weights, one per group, but {given} were given.")]
    InvalidWeights { expected: usize, given: usize },
    #[error("The instance has no soft group {0}.")]
    UnknownGroup(u32),
}
