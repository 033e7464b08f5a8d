//! Error types for strategy analysis

use thiserror::Error;

/// Errors raised while decoding or analysing strategies.
///
/// Construction-time failures (`InvalidEncoding`, `InvalidStateIndex`) are
/// never recovered inside the crate. Expected outcomes such as an
/// undetermined transition are returned as values, not as errors.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid encoding: {reason}")]
    InvalidEncoding { reason: String },

    #[error("state index {index} out of range for a {size}-state space")]
    InvalidStateIndex { index: usize, size: usize },

    #[error("action at state {state} is not determined")]
    UndeterminedAction { state: usize },

    #[error("negative cycle reachable from node {origin}")]
    NegativeCycleDetected { origin: usize },

    #[error("linear system is singular (pivot column {column})")]
    SingularSystem { column: usize },

    #[error("noise {noise} must lie strictly between 0 and 1")]
    InvalidNoise { noise: f64 },

    #[error("state spaces differ: expected {expected} states, got {got}")]
    SpaceMismatch { expected: usize, got: usize },

    #[error("line {line}: {source}")]
    InvalidLine {
        line: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn encoding(reason: impl Into<String>) -> Self {
        Error::InvalidEncoding { reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
