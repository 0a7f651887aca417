//! Snapshot layer — deterministic engine snapshots.
//!
//! Snapshots contain canonical JSON + hash for verification.
//! No timestamps in snapshot content.
//!
//! If a snapshot's hash doesn't match its content, the session falls back
//! to a full replay.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use turmite_engine::hashing::{canonical_hash, sha256_hex};
use turmite_engine::Engine;

use crate::error::RuntimeResult;
use crate::snapshot_codec::encode_snapshot;

/// Snapshot on-disk format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Sequence number of the last command applied before the snapshot.
    pub sequence: u64,
    /// Canonical JSON of the engine (UTF-8).
    pub canonical_json: String,
    /// SHA-256 of the canonical JSON.
    pub hash: String,
    pub format_version: u32,
}

fn snapshot_path(dir: &Path, sequence: u64) -> PathBuf {
    dir.join(format!("snapshot_{:06}.json", sequence))
}

/// Save a deterministic snapshot of the current engine.
pub fn save_snapshot(dir: &Path, sequence: u64, engine: &Engine) -> RuntimeResult<PathBuf> {
    fs::create_dir_all(dir)?;

    let snap = Snapshot {
        sequence,
        canonical_json: encode_snapshot(engine)?,
        hash: canonical_hash(engine),
        format_version: turmite_engine::FORMAT_VERSION,
    };

    let path = snapshot_path(dir, sequence);
    let content = serde_json::to_string(&snap)?;

    let mut file = File::create(&path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;

    info!(sequence, path = %path.display(), "snapshot saved");
    Ok(path)
}

/// Load the snapshot at a specific sequence number, if one exists.
pub fn load_snapshot(dir: &Path, sequence: u64) -> RuntimeResult<Option<Snapshot>> {
    let path = snapshot_path(dir, sequence);
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path)?;
    let snap: Snapshot = serde_json::from_str(&content)?;
    Ok(Some(snap))
}

/// Load the snapshot with the highest sequence in `dir`.
pub fn load_latest_snapshot(dir: &Path) -> RuntimeResult<Option<Snapshot>> {
    match snapshot_sequences(dir)?.last() {
        Some(&seq) => load_snapshot(dir, seq),
        None => Ok(None),
    }
}

/// Sequence numbers of every `snapshot_NNNNNN.json` in `dir`, ascending.
pub fn snapshot_sequences(dir: &Path) -> RuntimeResult<Vec<u64>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut sequences = Vec::new();
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name();
        let name = name.to_string_lossy();
        if let Some(seq) = name
            .strip_prefix("snapshot_")
            .and_then(|s| s.strip_suffix(".json"))
            .and_then(|s| s.parse::<u64>().ok())
        {
            sequences.push(seq);
        }
    }
    sequences.sort_unstable();
    Ok(sequences)
}

/// True if the stored hash matches the canonical JSON content.
pub fn verify_snapshot_hash(snap: &Snapshot) -> bool {
    sha256_hex(snap.canonical_json.as_bytes()) == snap.hash
}
