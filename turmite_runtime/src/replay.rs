//! Replay orchestrator — rebuild an engine from a command log.
//!
//! Delegates all simulation logic to the kernel. No shortcuts, no cached
//! state.

use turmite_engine::commands::Command;
use turmite_engine::hashing::canonical_hash;
use turmite_engine::{Engine, MovementPolicy};

use crate::error::{RuntimeError, RuntimeResult};

/// Rebuild an engine from a command sequence.
///
/// The first command must be `LoadTable`; it fixes the table and grid.
/// The policy starts at the default and only changes through
/// `SetPolicy` commands. Returns `(engine, canonical_hash)`.
pub fn rebuild_engine(commands: &[Command]) -> RuntimeResult<(Engine, String)> {
    let (first, rest) = commands
        .split_first()
        .ok_or_else(|| RuntimeError::EmptySession("replay".to_string()))?;

    let mut engine = match first {
        Command::LoadTable {
            table,
            width,
            height,
        } => Engine::new(table.clone(), *width, *height, MovementPolicy::default())?,
        other => {
            return Err(RuntimeError::MalformedCommand(format!(
                "log must start with load_table, found {}",
                other.kind()
            )))
        }
    };

    for command in rest {
        engine.apply(command)?;
    }

    let hash = canonical_hash(&engine);
    Ok((engine, hash))
}

/// Rebuild and return only the canonical hash.
pub fn rebuild_hash(commands: &[Command]) -> RuntimeResult<String> {
    let (_, hash) = rebuild_engine(commands)?;
    Ok(hash)
}
