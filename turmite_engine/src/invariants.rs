//! Turmite Engine — Invariant Checks
//!
//! A state is runnable against a table only if the routine can never
//! index outside the grid or the jump table. Restored snapshots are the
//! one place untrusted state enters the kernel, so they go through here.

use crate::state::SimulationState;
use crate::transitions::TransitionTable;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run every check. Panics with the first violation.
pub fn validate_invariants(state: &SimulationState, table: &TransitionTable) {
    if let Err(msg) = try_validate_invariants(state, table) {
        panic!("Invariant violation: {}", msg);
    }
}

/// Non-panicking variant of `validate_invariants`.
/// Returns `Err(message)` on the first failure, `Ok(())` if all pass.
pub fn try_validate_invariants(
    state: &SimulationState,
    table: &TransitionTable,
) -> Result<(), String> {
    check_grid_length(state)?;
    check_cell_symbols(state, table)?;
    check_head_in_bounds(state)?;
    check_head_state(state, table)?;
    check_direction_registers(state)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Individual checks
// ---------------------------------------------------------------------------

/// [grid_length] Exactly one cell per grid position.
fn check_grid_length(state: &SimulationState) -> Result<(), String> {
    let expected = state.dims.cell_count();
    if state.cells.len() != expected {
        return Err(format!(
            "[grid_length] grid has {} cells, {}x{} needs {}",
            state.cells.len(),
            state.dims.width(),
            state.dims.height(),
            expected
        ));
    }
    Ok(())
}

/// [cell_symbols] Every cell holds a symbol the table knows.
fn check_cell_symbols(state: &SimulationState, table: &TransitionTable) -> Result<(), String> {
    if let Some((i, &sym)) = state
        .cells
        .iter()
        .enumerate()
        .find(|&(_, &c)| usize::from(c) >= table.num_symbols())
    {
        return Err(format!(
            "[cell_symbols] cell {} holds symbol {} >= num_symbols {}",
            i,
            sym,
            table.num_symbols()
        ));
    }
    Ok(())
}

/// [head_bounds] Head sits on the grid.
fn check_head_in_bounds(state: &SimulationState) -> Result<(), String> {
    let h = state.head;
    if !state.dims.contains(h.x, h.y) {
        return Err(format!(
            "[head_bounds] head ({}, {}) outside {}x{}",
            h.x,
            h.y,
            state.dims.width(),
            state.dims.height()
        ));
    }
    Ok(())
}

/// [head_state] Current state exists in the table.
fn check_head_state(state: &SimulationState, table: &TransitionTable) -> Result<(), String> {
    if usize::from(state.head.state) >= table.num_states() {
        return Err(format!(
            "[head_state] state {} >= num_states {}",
            state.head.state,
            table.num_states()
        ));
    }
    Ok(())
}

/// [direction] Bounce registers are unit values.
fn check_direction_registers(state: &SimulationState) -> Result<(), String> {
    for (axis, dir) in [("dir_x", state.head.dir_x), ("dir_y", state.head.dir_y)] {
        if dir != 1 && dir != -1 {
            return Err(format!("[direction] {} is {}, expected -1 or 1", axis, dir));
        }
    }
    Ok(())
}
