/// Golden determinism test — runs Langton's ant (4 heading states,
/// 2 symbols) on a 64x64 torus and checks the canonical hash against
/// the permanent format-version-1 value.
///
/// This test must NEVER be modified to match new behavior.
/// If it fails, stepping or canonical serialization has changed.

use std::fs;

use turmite_engine::hashing::canonical_hash;
use turmite_engine::{Engine, MovementPolicy, TransitionTable, FORMAT_VERSION};

const GOLDEN_ITERATIONS: u64 = 11_000;

fn load_program(path: &str) -> TransitionTable {
    let data = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path, e));
    TransitionTable::deserialize(data.trim(), 64, 64).expect("Failed to parse golden program")
}

fn load_expected_hash(path: &str) -> String {
    fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path, e))
        .trim()
        .to_string()
}

fn golden_engine() -> Engine {
    let table = load_program("tests/golden/langton_program.txt");
    Engine::new(table, 64, 64, MovementPolicy::Wrap).expect("64x64 is a valid grid")
}

#[test]
fn golden_run_hash_matches() {
    let mut engine = golden_engine();
    engine.advance(GOLDEN_ITERATIONS).unwrap();
    let hash = canonical_hash(&engine);

    let expected = load_expected_hash("tests/golden/expected_hash.txt");
    assert_eq!(
        hash, expected,
        "GOLDEN TEST FAILED: Langton run produced a different hash.\n\
         Got:      {}\n\
         Expected: {}",
        hash, expected
    );
}

#[test]
fn golden_run_head_and_ink() {
    let mut engine = golden_engine();
    engine.advance(500).unwrap();
    let head = engine.head();
    assert_eq!((head.state, head.x, head.y), (2, 38, 28));
    assert_eq!(engine.grid().inked(), 62);

    engine.advance(GOLDEN_ITERATIONS - 500).unwrap();
    let head = engine.head();
    assert_eq!((head.state, head.x, head.y), (0, 58, 44));
    assert_eq!(engine.grid().inked(), 832);
}

#[test]
fn golden_initial_hash() {
    let engine = golden_engine();
    assert_eq!(
        canonical_hash(&engine),
        "a1c14ada3cde1c65ee6c7e4a69018ae2c745ccd48ae1709a57d0ec8d34e3c7ca"
    );
}

#[test]
fn golden_run_is_deterministic_in_batches() {
    let mut whole = golden_engine();
    whole.advance(GOLDEN_ITERATIONS).unwrap();

    let mut batched = golden_engine();
    let mut remaining = GOLDEN_ITERATIONS;
    let mut batch = 1;
    while remaining > 0 {
        let n = batch.min(remaining);
        batched.advance(n).unwrap();
        remaining -= n;
        batch = batch * 3 + 1;
    }

    assert_eq!(
        canonical_hash(&whole),
        canonical_hash(&batched),
        "DETERMINISM FAILURE: batched run diverged from a single advance"
    );
}

#[test]
fn format_version_is_one() {
    assert_eq!(FORMAT_VERSION, 1, "FORMAT_VERSION must be 1 until the layout changes");
}
