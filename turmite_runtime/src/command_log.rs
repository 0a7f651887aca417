//! Append-only command log — binary protobuf frames.
//!
//! Storage format: length-prefixed protobuf frames.
//!   [4-byte LE length][protobuf bytes][4-byte LE length][protobuf bytes]...
//!
//! Rules:
//!   - Strict append only: no mutation, no deletion, no reordering
//!   - fsync after every write
//!   - Sequence strictly increasing from 1 (validated on append and load)
//!   - Envelopes with schema_version != 1 are rejected on decode

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use prost::Message;
use tracing::{trace, warn};

use turmite_engine::commands::Command;

use crate::error::{RuntimeError, RuntimeResult};
use crate::proto_bridge::proto_to_command;
use crate::proto_types::ProtoCommandEnvelope;

/// Frames larger than this are treated as corruption.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Append-only command log backed by a binary file.
#[derive(Debug)]
pub struct CommandLog {
    path: PathBuf,
    last_sequence: u64,
}

impl CommandLog {
    /// Open or create a log at the given path. Existing frames are read
    /// and checked to find the last sequence number.
    pub fn open(path: &Path) -> RuntimeResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let last_sequence = if path.exists() {
            let envelopes = read_all_from_file(path)?;
            envelopes.last().map(|e| e.sequence).unwrap_or(0)
        } else {
            0
        };

        Ok(Self {
            path: path.to_path_buf(),
            last_sequence,
        })
    }

    /// Append one envelope. Its sequence must be `last_sequence() + 1`.
    pub fn append(&mut self, envelope: &ProtoCommandEnvelope) -> RuntimeResult<()> {
        let expected = self.last_sequence + 1;
        if envelope.sequence != expected {
            return Err(RuntimeError::Sequence {
                expected,
                got: envelope.sequence,
            });
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let buf = envelope.encode_to_vec();
        let start = file.metadata()?.len();

        if let Err(e) = write_frame(&mut file, &buf) {
            // A torn frame would make every later open fail.
            if let Err(trunc) = file.set_len(start) {
                warn!(error = %trunc, "could not truncate torn frame");
            }
            return Err(e.into());
        }

        trace!(sequence = envelope.sequence, bytes = buf.len(), "appended command");
        self.last_sequence = envelope.sequence;
        Ok(())
    }

    /// Every envelope in sequence order.
    pub fn load_all(&self) -> RuntimeResult<Vec<ProtoCommandEnvelope>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        read_all_from_file(&self.path)
    }

    /// Every logged command, decoded. Fails on the first envelope the
    /// kernel could not accept.
    pub fn load_commands(&self) -> RuntimeResult<Vec<Command>> {
        self.load_all()?
            .iter()
            .map(|envelope| proto_to_command(envelope).map(|(_, command)| command))
            .collect()
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Length prefix, payload, fsync.
fn write_frame(file: &mut File, buf: &[u8]) -> io::Result<()> {
    let len = buf.len() as u32;
    {
        let mut writer = BufWriter::new(&mut *file);
        writer.write_all(&len.to_le_bytes())?;
        writer.write_all(buf)?;
        writer.flush()?;
    }
    file.sync_all()
}

/// Read all frames from a file, validating frame integrity and sequence
/// continuity.
fn read_all_from_file(path: &Path) -> RuntimeResult<Vec<ProtoCommandEnvelope>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut envelopes: Vec<ProtoCommandEnvelope> = Vec::new();
    let mut len_buf = [0u8; 4];

    loop {
        match reader.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }

        let len = u32::from_le_bytes(len_buf) as usize;
        if len == 0 || len > MAX_FRAME_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid frame length: {}", len),
            )
            .into());
        }

        let mut frame = vec![0u8; len];
        reader.read_exact(&mut frame).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("truncated frame after sequence {}: {}", envelopes.len(), e),
            )
        })?;

        let envelope = ProtoCommandEnvelope::decode(frame.as_slice())?;
        let expected = envelopes.len() as u64 + 1;
        if envelope.sequence != expected {
            return Err(RuntimeError::Sequence {
                expected,
                got: envelope.sequence,
            });
        }
        envelopes.push(envelope);
    }

    Ok(envelopes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto_bridge::command_to_proto;

    fn scratch_log(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("turmite_command_log_tests").join(name);
        let _ = std::fs::remove_dir_all(&dir);
        dir.join("commands.bin")
    }

    #[test]
    fn append_then_reopen() {
        let path = scratch_log("reopen");
        {
            let mut log = CommandLog::open(&path).unwrap();
            assert_eq!(log.last_sequence(), 0);
            log.append(&command_to_proto(1, &Command::Reset)).unwrap();
            log.append(&command_to_proto(2, &Command::Advance { iterations: 5 }))
                .unwrap();
        }
        let log = CommandLog::open(&path).unwrap();
        assert_eq!(log.last_sequence(), 2);
        let all = log.load_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].sequence, 2);
        assert_eq!(
            log.load_commands().unwrap(),
            vec![Command::Reset, Command::Advance { iterations: 5 }]
        );
    }

    #[test]
    fn foreign_schema_version_fails_decode() {
        let path = scratch_log("schema");
        let mut log = CommandLog::open(&path).unwrap();
        let mut envelope = command_to_proto(1, &Command::Reset);
        envelope.schema_version = 2;
        log.append(&envelope).unwrap();
        assert!(matches!(
            log.load_commands(),
            Err(RuntimeError::SchemaVersion { expected: 1, got: 2 })
        ));
    }

    #[test]
    fn out_of_order_append_is_rejected() {
        let path = scratch_log("order");
        let mut log = CommandLog::open(&path).unwrap();
        let err = log.append(&command_to_proto(3, &Command::Reset)).unwrap_err();
        assert!(matches!(err, RuntimeError::Sequence { expected: 1, got: 3 }));
        assert_eq!(log.last_sequence(), 0);
        assert!(log.load_all().unwrap().is_empty());
    }

    #[test]
    fn zero_length_frame_is_corruption() {
        let path = scratch_log("zero_frame");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, 0u32.to_le_bytes()).unwrap();
        assert!(CommandLog::open(&path).is_err());
    }

    #[test]
    fn truncated_frame_is_corruption() {
        let path = scratch_log("truncated");
        {
            let mut log = CommandLog::open(&path).unwrap();
            log.append(&command_to_proto(1, &Command::Advance { iterations: 9 }))
                .unwrap();
        }
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 1]).unwrap();
        assert!(CommandLog::open(&path).is_err());
    }
}
