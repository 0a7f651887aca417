//! Error types for the turmite kernel.

/// Errors raised by table construction, edits, parsing and specialization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Construction-time domain violation (counts, grid dimensions).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Transition edit or lookup with an out-of-domain index or value.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// Share string could not be parsed into a transition table.
    #[error("malformed input: {0}")]
    MalformedInput(String),
}

/// Result type for kernel operations.
pub type EngineResult<T> = Result<T, EngineError>;
