//! Hand-written protobuf types for the command log.
//!
//! Uses prost derive macros for encode/decode without prost-build.
//! Field numbers are the wire contract; never renumber.

use prost::Message;

// ── Command Envelope ───────────────────────────────────────────

#[derive(Clone, PartialEq, Message)]
pub struct ProtoCommandEnvelope {
    #[prost(uint64, tag = "1")]
    pub sequence: u64,
    #[prost(uint32, tag = "2")]
    pub schema_version: u32,
    #[prost(message, optional, tag = "3")]
    pub command: Option<ProtoCommand>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ProtoCommand {
    #[prost(oneof = "CommandKind", tags = "1, 2, 3, 4, 5, 6")]
    pub kind: Option<CommandKind>,
}

#[derive(Clone, PartialEq, prost::Oneof)]
pub enum CommandKind {
    #[prost(message, tag = "1")]
    LoadTable(LoadTable),
    #[prost(message, tag = "2")]
    SetTransition(SetTransition),
    #[prost(message, tag = "3")]
    SetPolicy(SetPolicy),
    #[prost(message, tag = "4")]
    Advance(Advance),
    #[prost(message, tag = "5")]
    Reset(Reset),
    #[prost(message, tag = "6")]
    Resize(Resize),
}

// ── Transition table ───────────────────────────────────────────

/// Same flattening as the share string: symbol-major triples of
/// (next_state, next_symbol, action).
#[derive(Clone, PartialEq, Message)]
pub struct ProtoTransitionTable {
    #[prost(uint32, tag = "1")]
    pub num_states: u32,
    #[prost(uint32, tag = "2")]
    pub num_symbols: u32,
    #[prost(uint32, repeated, tag = "3")]
    pub entries: Vec<u32>,
}

// ── Commands ───────────────────────────────────────────────────

#[derive(Clone, PartialEq, Message)]
pub struct LoadTable {
    #[prost(message, optional, tag = "1")]
    pub table: Option<ProtoTransitionTable>,
    #[prost(uint32, tag = "2")]
    pub width: u32,
    #[prost(uint32, tag = "3")]
    pub height: u32,
}

#[derive(Clone, PartialEq, Message)]
pub struct SetTransition {
    #[prost(uint32, tag = "1")]
    pub state: u32,
    #[prost(uint32, tag = "2")]
    pub symbol: u32,
    #[prost(uint32, tag = "3")]
    pub next_state: u32,
    #[prost(uint32, tag = "4")]
    pub next_symbol: u32,
    #[prost(uint32, tag = "5")]
    pub action: u32,
}

#[derive(Clone, PartialEq, Message)]
pub struct SetPolicy {
    #[prost(uint32, tag = "1")]
    pub policy: u32,
}

#[derive(Clone, PartialEq, Message)]
pub struct Advance {
    #[prost(uint64, tag = "1")]
    pub iterations: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct Reset {}

#[derive(Clone, PartialEq, Message)]
pub struct Resize {
    #[prost(uint32, tag = "1")]
    pub width: u32,
    #[prost(uint32, tag = "2")]
    pub height: u32,
}
