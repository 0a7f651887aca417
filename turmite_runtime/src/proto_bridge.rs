//! Proto ↔ Kernel conversion bridge.
//!
//! Converts between protobuf wire types (proto_types.rs) and the
//! kernel's `Command` / `TransitionTable`. Decoding is strict: anything
//! the kernel would reject is reported as `MalformedCommand` here, before
//! it reaches an engine.

use turmite_engine::commands::{Command, SCHEMA_VERSION};
use turmite_engine::{Action, MovementPolicy, TransitionTable};

use crate::error::{RuntimeError, RuntimeResult};
use crate::proto_types::*;

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

pub fn table_to_proto(table: &TransitionTable) -> ProtoTransitionTable {
    ProtoTransitionTable {
        num_states: table.num_states() as u32,
        num_symbols: table.num_symbols() as u32,
        entries: table.to_triples().into_iter().map(|v| v as u32).collect(),
    }
}

pub fn proto_to_table(proto: &ProtoTransitionTable) -> RuntimeResult<TransitionTable> {
    let triples: Vec<u64> = proto.entries.iter().map(|&v| u64::from(v)).collect();
    TransitionTable::from_triples(
        proto.num_states as usize,
        proto.num_symbols as usize,
        &triples,
    )
    .map_err(|e| RuntimeError::MalformedCommand(format!("load_table: {}", e)))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Wrap a kernel command in a versioned envelope.
pub fn command_to_proto(sequence: u64, command: &Command) -> ProtoCommandEnvelope {
    let kind = match command {
        Command::LoadTable {
            table,
            width,
            height,
        } => CommandKind::LoadTable(LoadTable {
            table: Some(table_to_proto(table)),
            width: *width,
            height: *height,
        }),
        Command::SetTransition {
            state,
            symbol,
            next_state,
            next_symbol,
            action,
        } => CommandKind::SetTransition(SetTransition {
            state: *state as u32,
            symbol: *symbol as u32,
            next_state: *next_state as u32,
            next_symbol: *next_symbol as u32,
            action: u32::from(action.code()),
        }),
        Command::SetPolicy(policy) => CommandKind::SetPolicy(SetPolicy {
            policy: policy.code(),
        }),
        Command::Advance { iterations } => CommandKind::Advance(Advance {
            iterations: *iterations,
        }),
        Command::Reset => CommandKind::Reset(Reset {}),
        Command::Resize { width, height } => CommandKind::Resize(Resize {
            width: *width,
            height: *height,
        }),
    };

    ProtoCommandEnvelope {
        sequence,
        schema_version: SCHEMA_VERSION,
        command: Some(ProtoCommand { kind: Some(kind) }),
    }
}

/// Unwrap an envelope into `(sequence, command)`.
pub fn proto_to_command(proto: &ProtoCommandEnvelope) -> RuntimeResult<(u64, Command)> {
    if proto.schema_version != SCHEMA_VERSION {
        return Err(RuntimeError::SchemaVersion {
            expected: SCHEMA_VERSION,
            got: proto.schema_version,
        });
    }
    let kind = proto
        .command
        .as_ref()
        .and_then(|c| c.kind.as_ref())
        .ok_or_else(|| {
            RuntimeError::MalformedCommand(format!("envelope {} has no command", proto.sequence))
        })?;

    let command = match kind {
        CommandKind::LoadTable(lt) => {
            let table = lt.table.as_ref().ok_or_else(|| {
                RuntimeError::MalformedCommand("load_table: missing table".to_string())
            })?;
            Command::LoadTable {
                table: proto_to_table(table)?,
                width: lt.width,
                height: lt.height,
            }
        }
        CommandKind::SetTransition(st) => Command::SetTransition {
            state: st.state as usize,
            symbol: st.symbol as usize,
            next_state: st.next_state as usize,
            next_symbol: st.next_symbol as usize,
            action: Action::from_code(u64::from(st.action)).ok_or_else(|| {
                RuntimeError::MalformedCommand(format!(
                    "set_transition: invalid action code {}",
                    st.action
                ))
            })?,
        },
        CommandKind::SetPolicy(sp) => {
            Command::SetPolicy(MovementPolicy::from_code(sp.policy).ok_or_else(|| {
                RuntimeError::MalformedCommand(format!(
                    "set_policy: invalid policy code {}",
                    sp.policy
                ))
            })?)
        }
        CommandKind::Advance(a) => Command::Advance {
            iterations: a.iterations,
        },
        CommandKind::Reset(_) => Command::Reset,
        CommandKind::Resize(r) => Command::Resize {
            width: r.width,
            height: r.height,
        },
    };

    Ok((proto.sequence, command))
}

#[cfg(test)]
mod tests {
    use super::*;
    use turmite_engine::GenerationOptions;

    fn all_commands() -> Vec<Command> {
        vec![
            Command::LoadTable {
                table: TransitionTable::random_seeded(3, 4, GenerationOptions::default(), 9)
                    .unwrap(),
                width: 64,
                height: 32,
            },
            Command::SetTransition {
                state: 2,
                symbol: 3,
                next_state: 1,
                next_symbol: 0,
                action: Action::Stay,
            },
            Command::SetPolicy(MovementPolicy::Recenter),
            Command::Advance { iterations: 1 << 40 },
            Command::Reset,
            Command::Resize {
                width: 8,
                height: 1024,
            },
        ]
    }

    #[test]
    fn every_command_survives_the_wire() {
        use prost::Message;
        for (i, command) in all_commands().into_iter().enumerate() {
            let envelope = command_to_proto(i as u64 + 1, &command);
            let bytes = envelope.encode_to_vec();
            let decoded = ProtoCommandEnvelope::decode(bytes.as_slice()).unwrap();
            let (seq, back) = proto_to_command(&decoded).unwrap();
            assert_eq!(seq, i as u64 + 1);
            assert_eq!(back, command);
        }
    }

    #[test]
    fn wrong_schema_version_is_rejected() {
        let mut envelope = command_to_proto(1, &Command::Reset);
        envelope.schema_version = 99;
        assert!(matches!(
            proto_to_command(&envelope),
            Err(RuntimeError::SchemaVersion { got: 99, .. })
        ));
    }

    #[test]
    fn empty_envelope_is_rejected() {
        let envelope = ProtoCommandEnvelope {
            sequence: 4,
            schema_version: SCHEMA_VERSION,
            command: None,
        };
        assert!(matches!(
            proto_to_command(&envelope),
            Err(RuntimeError::MalformedCommand(_))
        ));
    }

    #[test]
    fn bad_codes_are_rejected() {
        let bad_action = ProtoCommandEnvelope {
            sequence: 1,
            schema_version: SCHEMA_VERSION,
            command: Some(ProtoCommand {
                kind: Some(CommandKind::SetTransition(SetTransition {
                    action: 7,
                    ..Default::default()
                })),
            }),
        };
        assert!(proto_to_command(&bad_action).is_err());

        let bad_policy = ProtoCommandEnvelope {
            sequence: 1,
            schema_version: SCHEMA_VERSION,
            command: Some(ProtoCommand {
                kind: Some(CommandKind::SetPolicy(SetPolicy { policy: 4 })),
            }),
        };
        assert!(proto_to_command(&bad_policy).is_err());
    }

    #[test]
    fn truncated_table_is_rejected() {
        let mut proto = table_to_proto(&TransitionTable::new(2, 2).unwrap());
        proto.entries.pop();
        assert!(matches!(
            proto_to_table(&proto),
            Err(RuntimeError::MalformedCommand(_))
        ));
    }
}
