//! Turmite Engine — Canonical Hashing
//!
//! Deterministic canonical serialization + SHA-256 hashing.
//! Produces byte-identical output across platforms.
//!
//! Rules:
//!   - Fixed field order (see `build_canonical_value`)
//!   - Table as its share string
//!   - Grid as lowercase hex, one byte per cell, row-major
//!   - UTF-8 JSON, no whitespace, no float

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::engine::Engine;
use crate::FORMAT_VERSION;

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Canonical serialization of an engine to UTF-8 JSON bytes.
pub fn canonical_serialize(engine: &Engine) -> Vec<u8> {
    build_canonical_value(engine).to_string().into_bytes()
}

/// SHA-256 of the canonical serialization. Lowercase hex string.
pub fn canonical_hash(engine: &Engine) -> String {
    sha256_hex(&canonical_serialize(engine))
}

/// Lowercase hex SHA-256 of arbitrary bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    encode_hex(&Sha256::digest(bytes))
}

pub fn encode_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0f) as usize] as char);
    }
    out
}

/// Inverse of `encode_hex`. `None` on odd length or a non-hex digit.
pub fn decode_hex(s: &str) -> Option<Vec<u8>> {
    fn nibble(c: u8) -> Option<u8> {
        match c {
            b'0'..=b'9' => Some(c - b'0'),
            b'a'..=b'f' => Some(c - b'a' + 10),
            b'A'..=b'F' => Some(c - b'A' + 10),
            _ => None,
        }
    }
    let bytes = s.as_bytes();
    if bytes.len() % 2 != 0 {
        return None;
    }
    bytes
        .chunks_exact(2)
        .map(|pair| Some(nibble(pair[0])? << 4 | nibble(pair[1])?))
        .collect()
}

/// Field order: format_version, program, width, height, policy, state,
///              x, y, dir_x, dir_y, iterations, grid
fn build_canonical_value(engine: &Engine) -> Value {
    let dims = engine.dims();
    let head = engine.head();

    let mut root = Map::new();
    root.insert(
        "format_version".to_string(),
        Value::Number(FORMAT_VERSION.into()),
    );
    root.insert("program".to_string(), Value::String(engine.share_string()));
    root.insert("width".to_string(), Value::Number(dims.width().into()));
    root.insert("height".to_string(), Value::Number(dims.height().into()));
    root.insert(
        "policy".to_string(),
        Value::String(engine.policy().name().to_string()),
    );
    root.insert("state".to_string(), Value::Number(head.state.into()));
    root.insert("x".to_string(), Value::Number(head.x.into()));
    root.insert("y".to_string(), Value::Number(head.y.into()));
    root.insert("dir_x".to_string(), Value::Number(head.dir_x.into()));
    root.insert("dir_y".to_string(), Value::Number(head.dir_y.into()));
    root.insert(
        "iterations".to_string(),
        Value::Number(engine.iteration_count().into()),
    );
    root.insert(
        "grid".to_string(),
        Value::String(encode_hex(engine.grid().cells())),
    );

    Value::Object(root)
}
