#![forbid(unsafe_code)]

//! Turmite Runtime
//!
//! Wraps the kernel with persistence, replay, snapshots, session
//! management, frame pacing and drift detection.
//!
//! No simulation logic lives here; every state change goes through
//! `Engine::apply`.

pub mod error;
pub mod config;
pub mod proto_types;
pub mod proto_bridge;
pub mod command_log;
pub mod replay;
pub mod snapshot;
pub mod snapshot_codec;
pub mod session;
pub mod driver;
pub mod drift;

pub use config::RunConfig;
pub use error::{RuntimeError, RuntimeResult};
pub use session::{Session, SharedSession};
