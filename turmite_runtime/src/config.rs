//! Run configuration.
//!
//! Every field has a default, so a config file only needs the keys it
//! changes. CLI flags override whatever the file says.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use turmite_engine::MovementPolicy;

use crate::error::RuntimeResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub width: u32,
    pub height: u32,
    /// States of a randomly generated table.
    pub states: usize,
    /// Symbols of a randomly generated table.
    pub symbols: usize,
    pub policy: MovementPolicy,
    pub ink_bias: bool,
    /// Fixed seed for table generation. Fresh entropy when absent.
    pub seed: Option<u64>,
    /// Target iterations per frame; snapped onto the driver's speed ladder.
    pub iterations_per_frame: u64,
    pub frame_budget_ms: u64,
    /// Upper bound on a single `advance` call.
    pub max_batch: u64,
    /// Commands between automatic snapshots. 0 disables them.
    pub snapshot_interval: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            states: 4,
            symbols: 3,
            policy: MovementPolicy::Wrap,
            ink_bias: false,
            seed: None,
            iterations_per_frame: 100_000,
            frame_budget_ms: 20,
            max_batch: 50_000,
            snapshot_interval: 100,
        }
    }
}

impl RunConfig {
    /// Read a JSON config file.
    pub fn load(path: &Path) -> RuntimeResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
