//! Turmite Engine — Command Definitions
//!
//! Commands are pure data: one per state-changing engine call.
//! They carry intent and arguments only; `Engine::apply` executes them.
//!
//! Schema version is locked at 1. Logged commands with another version
//! are rejected when read back.

use crate::domain::{Action, MovementPolicy};
use crate::transitions::TransitionTable;

/// Schema version for logged commands.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Install a new table on a (possibly new) grid and reset.
    LoadTable {
        table: TransitionTable,
        width: u32,
        height: u32,
    },
    /// Edit one table entry.
    SetTransition {
        state: usize,
        symbol: usize,
        next_state: usize,
        next_symbol: usize,
        action: Action,
    },
    SetPolicy(MovementPolicy),
    Advance {
        iterations: u64,
    },
    Reset,
    /// Reallocate the grid and reset.
    Resize {
        width: u32,
        height: u32,
    },
}

impl Command {
    pub fn kind(&self) -> &'static str {
        match self {
            Command::LoadTable { .. } => "load_table",
            Command::SetTransition { .. } => "set_transition",
            Command::SetPolicy(_) => "set_policy",
            Command::Advance { .. } => "advance",
            Command::Reset => "reset",
            Command::Resize { .. } => "resize",
        }
    }

    /// Whether applying this command discards the specialized routine.
    pub fn invalidates_routine(&self) -> bool {
        matches!(
            self,
            Command::LoadTable { .. }
                | Command::SetTransition { .. }
                | Command::SetPolicy(_)
                | Command::Resize { .. }
        )
    }
}
