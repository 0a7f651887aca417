//! Drift detection — determinism verification and frame comparison.
//!
//! Integer arithmetic only; no float anywhere.

use turmite_engine::commands::Command;
use turmite_engine::state::Frame;

use crate::error::{RuntimeError, RuntimeResult};
use crate::replay;

/// Replay the same commands twice and require identical hashes.
pub fn verify_determinism(commands: &[Command]) -> RuntimeResult<String> {
    let first = replay::rebuild_hash(commands)?;
    let second = replay::rebuild_hash(commands)?;

    if first != second {
        return Err(RuntimeError::Determinism { first, second });
    }
    Ok(first)
}

/// Structured comparison of two frames. `a` is the baseline.
///
/// Cell differences are only counted when both frames share dimensions.
pub fn compare_frames(a: &Frame, b: &Frame) -> DriftReport {
    let same_dims = a.dims == b.dims;
    let (differing_cells, first_difference) = if same_dims {
        let mut count = 0u64;
        let mut first = None;
        for (i, (ca, cb)) in a.cells.iter().zip(&b.cells).enumerate() {
            if ca != cb {
                count += 1;
                first.get_or_insert(i);
            }
        }
        (count, first)
    } else {
        (0, None)
    };

    let inked = |f: &Frame| f.cells.iter().filter(|&&c| c != 0).count() as i64;
    let inked_a = inked(a);
    let inked_b = inked(b);

    DriftReport {
        same_dims,
        differing_cells,
        first_difference,
        inked_a,
        inked_b,
        inked_delta: inked_b - inked_a,
        head_dx: i64::from(b.head.x) - i64::from(a.head.x),
        head_dy: i64::from(b.head.y) - i64::from(a.head.y),
        state_a: a.head.state,
        state_b: b.head.state,
        iteration_delta: i128::from(b.iterations) - i128::from(a.iterations),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftReport {
    pub same_dims: bool,
    pub differing_cells: u64,
    /// Row-major index of the first differing cell.
    pub first_difference: Option<usize>,
    pub inked_a: i64,
    pub inked_b: i64,
    pub inked_delta: i64,
    pub head_dx: i64,
    pub head_dy: i64,
    pub state_a: u8,
    pub state_b: u8,
    pub iteration_delta: i128,
}

impl DriftReport {
    /// True when the frames are indistinguishable.
    pub fn is_identical(&self) -> bool {
        self.same_dims
            && self.differing_cells == 0
            && self.head_dx == 0
            && self.head_dy == 0
            && self.state_a == self.state_b
            && self.iteration_delta == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turmite_engine::{Engine, MovementPolicy, TransitionTable};

    fn load() -> Command {
        Command::LoadTable {
            table: "1,2,0,1,1,0,0,0".parse::<TransitionTable>().unwrap(),
            width: 16,
            height: 16,
        }
    }

    #[test]
    fn determinism_holds_for_a_plain_log() {
        let commands = vec![load(), Command::Advance { iterations: 100 }];
        let hash = verify_determinism(&commands).unwrap();
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn identical_frames_have_no_drift() {
        let engine = Engine::new(
            "1,2,0,1,1,0,0,0".parse().unwrap(),
            16,
            16,
            MovementPolicy::Wrap,
        )
        .unwrap();
        let report = compare_frames(&engine.frame(), &engine.frame());
        assert!(report.is_identical());
    }

    #[test]
    fn drift_counts_cells_and_head_movement() {
        let mut engine = Engine::new(
            "1,2,0,1,1,0,0,0".parse().unwrap(),
            16,
            16,
            MovementPolicy::Wrap,
        )
        .unwrap();
        let before = engine.frame();
        engine.advance(3).unwrap();
        let after = engine.frame();

        let report = compare_frames(&before, &after);
        assert!(!report.is_identical());
        assert_eq!(report.differing_cells, 3);
        assert_eq!(report.inked_delta, 3);
        assert_eq!(report.head_dx, 3);
        assert_eq!(report.head_dy, 0);
        assert_eq!(report.iteration_delta, 3);
        assert_eq!(report.first_difference, Some(8 * 16 + 8));
    }
}
