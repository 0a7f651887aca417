//! Snapshot Codec — deterministic engine encoder/decoder.
//!
//! Pure codec layer. No side-effects, no timestamps, no envelope.
//!
//! - `encode_snapshot`:  Engine → canonical JSON string
//! - `decode_snapshot`:  JSON string → SimulationSnapshot (strict, no defaults)
//! - `restore_snapshot`: decode + rebuild + invariant validation
//! - `export_snapshot_to_file` / `import_snapshot_from_file`: file I/O
//! - `snapshot_hash`:    SHA-256 of canonical JSON (lowercase hex)
//!
//! The encoding is byte-identical to `hashing::canonical_serialize`, so a
//! snapshot file hashes to the engine's canonical hash.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use turmite_engine::hashing::{decode_hex, encode_hex, sha256_hex};
use turmite_engine::invariants::try_validate_invariants;
use turmite_engine::state::SimulationState;
use turmite_engine::{Engine, GridDims, HeadState, MovementPolicy, TransitionTable, FORMAT_VERSION};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// All possible snapshot codec failures.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("SerializationError: {0}")]
    Serialization(String),
    /// Malformed JSON, missing or unknown fields, bad program or grid.
    #[error("DeserializationError: {0}")]
    Deserialization(String),
    /// Decoded state cannot run against its own table.
    #[error("InvariantViolation: {0}")]
    InvariantViolation(String),
    #[error("IoError: {0}")]
    Io(#[from] io::Error),
}

// ---------------------------------------------------------------------------
// Wire form
// ---------------------------------------------------------------------------

/// Flat snapshot record. Field order is the canonical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationSnapshot {
    pub format_version: u32,
    /// Share string of the table.
    pub program: String,
    pub width: u32,
    pub height: u32,
    pub policy: MovementPolicy,
    pub state: u8,
    pub x: u32,
    pub y: u32,
    pub dir_x: i8,
    pub dir_y: i8,
    pub iterations: u64,
    /// Row-major cells, lowercase hex, one byte per cell.
    pub grid: String,
}

impl SimulationSnapshot {
    pub fn capture(engine: &Engine) -> Self {
        let dims = engine.dims();
        let head = engine.head();
        Self {
            format_version: FORMAT_VERSION,
            program: engine.share_string(),
            width: dims.width(),
            height: dims.height(),
            policy: engine.policy(),
            state: head.state,
            x: head.x,
            y: head.y,
            dir_x: head.dir_x,
            dir_y: head.dir_y,
            iterations: engine.iteration_count(),
            grid: encode_hex(engine.grid().cells()),
        }
    }
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// Encode an engine to a canonical JSON string.
pub fn encode_snapshot(engine: &Engine) -> Result<String, SnapshotError> {
    serde_json::to_string(&SimulationSnapshot::capture(engine))
        .map_err(|e| SnapshotError::Serialization(e.to_string()))
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Decode a JSON string into a snapshot record.
///
/// Strict: unknown fields and missing fields both fail. No invariant
/// validation; use `restore_snapshot` for validated loading.
pub fn decode_snapshot(json: &str) -> Result<SimulationSnapshot, SnapshotError> {
    serde_json::from_str::<SimulationSnapshot>(json)
        .map_err(|e| SnapshotError::Deserialization(e.to_string()))
}

// ---------------------------------------------------------------------------
// Restore (decode + validate)
// ---------------------------------------------------------------------------

/// Decode a JSON string and rebuild a runnable engine from it.
///
/// This is the entry point for loading state from untrusted sources.
/// The routine is not rebuilt here; the first `advance` does that.
pub fn restore_snapshot(json: &str) -> Result<Engine, SnapshotError> {
    let snap = decode_snapshot(json)?;
    if snap.format_version != FORMAT_VERSION {
        return Err(SnapshotError::Deserialization(format!(
            "format_version {} is not supported (expected {})",
            snap.format_version, FORMAT_VERSION
        )));
    }

    let table: TransitionTable = snap
        .program
        .parse()
        .map_err(|e| SnapshotError::Deserialization(format!("program: {}", e)))?;
    let dims = GridDims::new(snap.width, snap.height)
        .map_err(|e| SnapshotError::InvariantViolation(e.to_string()))?;
    let cells = decode_hex(&snap.grid)
        .ok_or_else(|| SnapshotError::Deserialization("grid is not valid hex".to_string()))?;

    let head = HeadState {
        state: snap.state,
        x: snap.x,
        y: snap.y,
        dir_x: snap.dir_x,
        dir_y: snap.dir_y,
    };
    let state = SimulationState::from_parts(dims, cells, head, snap.iterations);
    try_validate_invariants(&state, &table).map_err(SnapshotError::InvariantViolation)?;

    Engine::from_parts(table, snap.policy, state)
        .map_err(|e| SnapshotError::InvariantViolation(e.to_string()))
}

// ---------------------------------------------------------------------------
// File I/O
// ---------------------------------------------------------------------------

/// Export an engine to a file as canonical JSON. Creates parent
/// directories if needed.
pub fn export_snapshot_to_file(engine: &Engine, path: &Path) -> Result<(), SnapshotError> {
    let json = encode_snapshot(engine)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, json.as_bytes())?;
    Ok(())
}

/// Import and validate an engine from a JSON file.
pub fn import_snapshot_from_file(path: &Path) -> Result<Engine, SnapshotError> {
    let content = fs::read_to_string(path)?;
    restore_snapshot(&content)
}

// ---------------------------------------------------------------------------
// Hash
// ---------------------------------------------------------------------------

/// SHA-256 of the snapshot encoding. Equal to `canonical_hash(engine)`.
pub fn snapshot_hash(engine: &Engine) -> Result<String, SnapshotError> {
    let json = encode_snapshot(engine)?;
    Ok(sha256_hex(json.as_bytes()))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
