//! Runtime error type.

use turmite_engine::EngineError;

use crate::snapshot_codec::SnapshotError;

/// Everything that can go wrong outside the kernel.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("protobuf decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// A logged command could not be turned back into a kernel command.
    #[error("malformed command: {0}")]
    MalformedCommand(String),

    /// Log sequence numbers must be 1, 2, 3, ...
    #[error("sequence violation: expected {expected}, got {got}")]
    Sequence { expected: u64, got: u64 },

    #[error("schema version mismatch: expected {expected}, got {got}")]
    SchemaVersion { expected: u32, got: u32 },

    /// Two replays of the same log disagreed.
    #[error("determinism failure: run 1 {first}, run 2 {second}")]
    Determinism { first: String, second: String },

    #[error("session {0:?} already exists")]
    SessionExists(String),

    #[error("session {0:?} has no commands")]
    EmptySession(String),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
