#![forbid(unsafe_code)]

//! Turmite Engine — Kernel
//!
//! A finite-state head on a power-of-two grid of byte symbols. Each
//! transition table is compiled into a dedicated jump-table routine the
//! first time it runs; edits drop the routine and the next `advance`
//! rebuilds it.

/// Version of the canonical serialization. Bump on any layout change.
pub const FORMAT_VERSION: u32 = 1;

pub mod arithmetic;
pub mod error;
pub mod domain;
pub mod commands;
pub mod state;
pub mod transitions;
pub mod specialize;
pub mod invariants;
pub mod hashing;
pub mod engine;

pub use domain::{Action, GenerationOptions, GridDims, HeadState, MovementPolicy, StateId, Symbol, Transition};
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use transitions::TransitionTable;
