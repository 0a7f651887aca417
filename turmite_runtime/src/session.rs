//! Session manager — isolated sessions with persist-after-apply semantics.
//!
//! Each session gets its own directory with a command log and snapshots.
//! Concurrency: Mutex for write serialization, no global mutable state.
//!
//! Apply-before-persist order:
//!   1. copy.apply(command)     (may fail; nothing is logged then)
//!   2. log.append(envelope)    (only if step 1 succeeded)
//!   3. live engine = copy      (only if step 2 succeeded)
//!   4. snapshot if interval reached (best effort)

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use turmite_engine::commands::Command;
use turmite_engine::hashing::canonical_hash;
use turmite_engine::{Engine, MovementPolicy, TransitionTable};

use crate::command_log::CommandLog;
use crate::error::{RuntimeError, RuntimeResult};
use crate::proto_bridge::command_to_proto;
use crate::replay;
use crate::snapshot::{self, verify_snapshot_hash};
use crate::snapshot_codec::restore_snapshot;

pub const LOG_FILE: &str = "commands.log";
pub const SNAPSHOT_DIR: &str = "snapshots";

/// Largest `Advance` that `Session::run` logs as one command.
pub const DEFAULT_MAX_BATCH: u64 = 50_000;

/// An isolated simulation session with its own command log and engine.
#[derive(Debug)]
pub struct Session {
    session_id: String,
    dir: PathBuf,
    engine: Engine,
    log: CommandLog,
    snapshot_interval: u64,
    max_batch: u64,
}

impl Session {
    /// Start a new session.
    ///
    /// Directory structure:
    ///   <base_dir>/<session_id>/commands.log
    ///   <base_dir>/<session_id>/snapshots/
    ///
    /// The log opens with a `LoadTable` command, followed by `SetPolicy`
    /// when `policy` is not the default.
    pub fn create(
        base_dir: &Path,
        session_id: &str,
        table: TransitionTable,
        width: u32,
        height: u32,
        policy: MovementPolicy,
        snapshot_interval: u64,
    ) -> RuntimeResult<Self> {
        let dir = base_dir.join(session_id);
        let log = CommandLog::open(&dir.join(LOG_FILE))?;
        if log.last_sequence() > 0 {
            return Err(RuntimeError::SessionExists(session_id.to_string()));
        }

        let engine = Engine::new(table.clone(), width, height, MovementPolicy::default())?;
        let mut session = Self {
            session_id: session_id.to_string(),
            dir,
            engine,
            log,
            snapshot_interval,
            max_batch: DEFAULT_MAX_BATCH,
        };

        session.apply(&Command::LoadTable {
            table,
            width,
            height,
        })?;
        if policy != MovementPolicy::default() {
            session.apply(&Command::SetPolicy(policy))?;
        }

        info!(session = session_id, width, height, %policy, "session created");
        Ok(session)
    }

    /// Reopen an existing session.
    ///
    /// Starts from the latest snapshot whose hash verifies and replays the
    /// commands after it. Any snapshot problem falls back to a full replay.
    pub fn open(base_dir: &Path, session_id: &str, snapshot_interval: u64) -> RuntimeResult<Self> {
        let dir = base_dir.join(session_id);
        let log = CommandLog::open(&dir.join(LOG_FILE))?;
        let commands = log.load_commands()?;
        if commands.is_empty() {
            return Err(RuntimeError::EmptySession(session_id.to_string()));
        }

        let engine = match resume_from_snapshot(&dir.join(SNAPSHOT_DIR), &commands)? {
            Some(engine) => engine,
            None => replay::rebuild_engine(&commands)?.0,
        };

        info!(
            session = session_id,
            sequence = log.last_sequence(),
            iterations = engine.iteration_count(),
            "session opened"
        );
        Ok(Self {
            session_id: session_id.to_string(),
            dir,
            engine,
            log,
            snapshot_interval,
            max_batch: DEFAULT_MAX_BATCH,
        })
    }

    /// Cap on the iterations `run` packs into one logged command.
    pub fn set_max_batch(&mut self, max_batch: u64) {
        self.max_batch = max_batch.max(1);
    }

    /// Apply a single command, then persist it.
    ///
    /// The command runs on a copy of the engine, which replaces the live
    /// one only once the log append has succeeded, so the engine never
    /// holds state the log cannot reproduce. A failed snapshot is logged
    /// and skipped; the command is already durable at that point.
    pub fn apply(&mut self, command: &Command) -> RuntimeResult<u64> {
        let mut next = self.engine.clone();
        let iterations = next.apply(command)?;

        let sequence = self.log.last_sequence() + 1;
        self.log.append(&command_to_proto(sequence, command))?;
        self.engine = next;

        if self.snapshot_interval > 0 && sequence % self.snapshot_interval == 0 {
            if let Err(e) =
                snapshot::save_snapshot(&self.dir.join(SNAPSHOT_DIR), sequence, &self.engine)
            {
                warn!(sequence, error = %e, "snapshot failed, continuing without it");
            }
        }

        Ok(iterations)
    }

    /// Advance by `total` iterations, logged as `Advance` commands of at
    /// most `max_batch` each.
    pub fn run(&mut self, total: u64) -> RuntimeResult<u64> {
        let mut remaining = total;
        let mut iterations = self.engine.iteration_count();
        while remaining > 0 {
            let chunk = remaining.min(self.max_batch);
            iterations = self.apply(&Command::Advance { iterations: chunk })?;
            remaining -= chunk;
        }
        Ok(iterations)
    }

    /// Every command logged so far, decoded.
    pub fn load_commands(&self) -> RuntimeResult<Vec<Command>> {
        self.log.load_commands()
    }

    /// Discard the live engine and rebuild it from the whole log.
    pub fn replay_full(&mut self) -> RuntimeResult<String> {
        let commands = self.log.load_commands()?;
        let (engine, hash) = replay::rebuild_engine(&commands)?;
        self.engine = engine;
        info!(session = %self.session_id, commands = commands.len(), "full replay");
        Ok(hash)
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn current_hash(&self) -> String {
        canonical_hash(&self.engine)
    }

    pub fn current_sequence(&self) -> u64 {
        self.log.last_sequence()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Restore from the newest snapshot not past the end of the log and
/// replay the tail. `None` means the caller should replay everything.
fn resume_from_snapshot(
    snapshot_dir: &Path,
    commands: &[Command],
) -> RuntimeResult<Option<Engine>> {
    let sequences = match snapshot::snapshot_sequences(snapshot_dir) {
        Ok(sequences) => sequences,
        Err(e) => {
            warn!(error = %e, "cannot list snapshots, replaying from scratch");
            return Ok(None);
        }
    };
    let Some(sequence) = sequences
        .into_iter()
        .rev()
        .find(|&seq| seq > 0 && seq <= commands.len() as u64)
    else {
        return Ok(None);
    };

    let snap = match snapshot::load_snapshot(snapshot_dir, sequence) {
        Ok(Some(snap)) => snap,
        Ok(None) => return Ok(None),
        Err(e) => {
            warn!(sequence, error = %e, "unreadable snapshot, replaying from scratch");
            return Ok(None);
        }
    };
    if !verify_snapshot_hash(&snap) {
        warn!(sequence, "snapshot hash mismatch, replaying from scratch");
        return Ok(None);
    }
    let mut engine = match restore_snapshot(&snap.canonical_json) {
        Ok(engine) => engine,
        Err(e) => {
            warn!(sequence, error = %e, "snapshot rejected, replaying from scratch");
            return Ok(None);
        }
    };

    for command in &commands[sequence as usize..] {
        engine.apply(command)?;
    }
    Ok(Some(engine))
}

/// Thread-safe session handle using Mutex.
#[derive(Debug)]
pub struct SharedSession {
    inner: Mutex<Session>,
}

impl SharedSession {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Mutex::new(session),
        }
    }

    /// A panic mid-apply leaves either the pre- or post-command engine;
    /// both are consistent, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn apply(&self, command: &Command) -> RuntimeResult<u64> {
        self.lock().apply(command)
    }

    pub fn run(&self, total: u64) -> RuntimeResult<u64> {
        self.lock().run(total)
    }

    pub fn current_hash(&self) -> String {
        self.lock().current_hash()
    }

    pub fn current_sequence(&self) -> u64 {
        self.lock().current_sequence()
    }

    pub fn into_inner(self) -> Session {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}
