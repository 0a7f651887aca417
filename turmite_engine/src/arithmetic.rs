//! Turmite Engine — Addressing Arithmetic
//!
//! Hard limits of the addressing scheme and the integer helpers the
//! specializer relies on. Grid rows are addressed by shift, columns by
//! mask, so every dimension is an exact power of two.

use crate::error::{EngineError, EngineResult};

/// Largest number of machine states. State ids are stored in one byte.
pub const MAX_STATES: usize = 256;
/// Largest number of tape symbols. Cells are stored in one byte.
pub const MAX_SYMBOLS: usize = 256;
/// Smallest grid side. A side of 1 leaves no room to move or reflect.
pub const MIN_DIMENSION: u32 = 2;
/// Largest grid side (2^14), keeps `y << log_width | x` well inside u32.
pub const MAX_DIMENSION: u32 = 1 << 14;

/// Exact base-2 logarithm, `None` unless `n` is a power of two.
pub fn perfect_log2(n: u32) -> Option<u32> {
    if n.is_power_of_two() {
        Some(n.trailing_zeros())
    } else {
        None
    }
}

/// `ceil(log2(n))` for `n >= 1`; the bit width reserved for a symbol
/// in the dispatch key.
pub fn ceil_log2(n: u32) -> u32 {
    if n <= 1 {
        0
    } else {
        u32::BITS - (n - 1).leading_zeros()
    }
}

/// Validate one grid side and return its log2.
pub fn dimension_log2(name: &str, n: u32) -> EngineResult<u32> {
    if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&n) {
        return Err(EngineError::InvalidParameter(format!(
            "{} {} outside [{}, {}]",
            name, n, MIN_DIMENSION, MAX_DIMENSION
        )));
    }
    perfect_log2(n).ok_or_else(|| {
        EngineError::InvalidParameter(format!("{} {} must be a power of two", name, n))
    })
}

/// Checked iteration counter addition.
pub fn checked_iterations(count: u64, iterations: u64) -> EngineResult<u64> {
    count.checked_add(iterations).ok_or_else(|| {
        EngineError::InvalidParameter(format!(
            "iteration count {} + {} overflows u64",
            count, iterations
        ))
    })
}
