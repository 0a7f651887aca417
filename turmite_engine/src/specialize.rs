//! Turmite Engine — Table Specialization
//!
//! Compiles a transition table, grid geometry and movement policy into a
//! `Routine`: a dense jump table keyed by `symbol | state << symbol_bits`.
//! Each handler carries the pre-shifted key of its next state, the symbol
//! to write (only when it differs from the one read) and a resolved step.
//!
//! The run loop never touches the `TransitionTable`. It is monomorphised
//! per `Locomotion` so boundary handling is inlined into the hot loop.

use std::fmt;

use tracing::debug;

use crate::arithmetic::ceil_log2;
use crate::domain::{Action, GridDims, MovementPolicy, StateId, Symbol};
use crate::error::{EngineError, EngineResult};
use crate::state::SimulationState;
use crate::transitions::TransitionTable;

// ---------------------------------------------------------------------------
// Locomotion
// ---------------------------------------------------------------------------

/// Boundary behaviour along one axis.
///
/// `shift` moves `pos` by `delta` (always ±1) on an axis of `extent`
/// cells and returns the new coordinate, which must lie in `[0, extent)`.
/// `dir` is the axis direction register.
pub trait Locomotion {
    fn shift(pos: u32, delta: i32, dir: &mut i8, extent: u32) -> u32;
}

/// Toroidal wraparound. `extent` is a power of two, so masking is exact.
pub struct Wrap;

impl Locomotion for Wrap {
    #[inline(always)]
    fn shift(pos: u32, delta: i32, _dir: &mut i8, extent: u32) -> u32 {
        pos.wrapping_add_signed(delta) & (extent - 1)
    }
}

/// Moves along the direction register; on hitting an edge the register
/// flips and the head reflects one unit back inside.
pub struct Bounce;

impl Locomotion for Bounce {
    #[inline(always)]
    fn shift(pos: u32, delta: i32, dir: &mut i8, extent: u32) -> u32 {
        let step = delta * i32::from(*dir);
        let next = pos as i32 + step;
        if next < 0 || next >= extent as i32 {
            *dir = -*dir;
            (pos as i32 - step) as u32
        } else {
            next as u32
        }
    }
}

/// Saturates at the edge.
pub struct Clamp;

impl Locomotion for Clamp {
    #[inline(always)]
    fn shift(pos: u32, delta: i32, _dir: &mut i8, extent: u32) -> u32 {
        (pos as i32 + delta).clamp(0, extent as i32 - 1) as u32
    }
}

/// Leaving the grid puts the coordinate back at the axis centre.
pub struct Recenter;

impl Locomotion for Recenter {
    #[inline(always)]
    fn shift(pos: u32, delta: i32, _dir: &mut i8, extent: u32) -> u32 {
        let next = pos as i32 + delta;
        if next < 0 || next >= extent as i32 {
            extent / 2
        } else {
            next as u32
        }
    }
}

// ---------------------------------------------------------------------------
// Routine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Stay,
    Left,
    Right,
    Up,
    Down,
}

impl From<Action> for Step {
    fn from(action: Action) -> Self {
        match action {
            Action::Left => Step::Left,
            Action::Right => Step::Right,
            Action::Up => Step::Up,
            Action::Down => Step::Down,
            Action::Stay => Step::Stay,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Handler {
    next_key: u32,
    write: Option<Symbol>,
    step: Step,
    reachable: bool,
}

/// A step routine specialized to one table, grid and policy.
#[derive(Debug, Clone)]
pub struct Routine {
    handlers: Box<[Handler]>,
    symbol_bits: u32,
    num_states: usize,
    num_symbols: usize,
    dims: GridDims,
    policy: MovementPolicy,
}

/// Build the dispatch structure for `table` on a `width × height` grid.
///
/// Fails with `InvalidParameter` if either side is not an accepted power
/// of two.
pub fn specialize(
    table: &TransitionTable,
    width: u32,
    height: u32,
    policy: MovementPolicy,
) -> EngineResult<Routine> {
    let dims = GridDims::new(width, height)?;
    let num_states = table.num_states();
    let num_symbols = table.num_symbols();
    let symbol_bits = ceil_log2(num_symbols as u32);
    let key_space = num_states << symbol_bits;
    if key_space > 1 << 16 {
        return Err(EngineError::InvalidParameter(format!(
            "dispatch key space {} exceeds 16 bits",
            key_space
        )));
    }

    // Slots for symbols >= num_symbols are never read from a valid grid;
    // they hold a self-loop so the table stays total.
    let mut handlers: Vec<Handler> = (0..key_space)
        .map(|key| Handler {
            next_key: ((key >> symbol_bits) << symbol_bits) as u32,
            write: None,
            step: Step::Stay,
            reachable: false,
        })
        .collect();

    for (state, symbol, t) in table.iter() {
        let key = symbol | (state << symbol_bits);
        handlers[key] = Handler {
            next_key: u32::from(t.next_state) << symbol_bits,
            write: (usize::from(t.next_symbol) != symbol).then_some(t.next_symbol),
            step: Step::from(t.action),
            reachable: true,
        };
    }

    debug!(
        num_states,
        num_symbols,
        symbol_bits,
        key_space,
        width,
        height,
        policy = policy.name(),
        "specialized transition table"
    );

    Ok(Routine {
        handlers: handlers.into_boxed_slice(),
        symbol_bits,
        num_states,
        num_symbols,
        dims,
        policy,
    })
}

impl Routine {
    pub fn dims(&self) -> GridDims {
        self.dims
    }

    pub fn policy(&self) -> MovementPolicy {
        self.policy
    }

    pub fn symbol_bits(&self) -> u32 {
        self.symbol_bits
    }

    /// Size of the jump table, including padding slots.
    pub fn key_space(&self) -> usize {
        self.handlers.len()
    }

    /// Run `iterations` steps over `sim`. The caller guarantees `sim` has
    /// the dimensions this routine was built for and satisfies the state
    /// invariants. Does not touch the iteration counter.
    pub(crate) fn run(&self, sim: &mut SimulationState, iterations: u64) {
        debug_assert_eq!(sim.dims, self.dims);
        match self.policy {
            MovementPolicy::Wrap => self.run_with::<Wrap>(sim, iterations),
            MovementPolicy::Bounce => self.run_with::<Bounce>(sim, iterations),
            MovementPolicy::Clamp => self.run_with::<Clamp>(sim, iterations),
            MovementPolicy::Recenter => self.run_with::<Recenter>(sim, iterations),
        }
    }

    fn run_with<L: Locomotion>(&self, sim: &mut SimulationState, iterations: u64) {
        let SimulationState { cells, head, .. } = sim;
        let handlers = &self.handlers[..];
        let bits = self.symbol_bits;
        let log_width = self.dims.log_width();
        let width = self.dims.width();
        let height = self.dims.height();

        let mut key = u32::from(head.state) << bits;
        let (mut x, mut y) = (head.x, head.y);
        let (mut dir_x, mut dir_y) = (head.dir_x, head.dir_y);

        for _ in 0..iterations {
            let pos = ((y << log_width) | x) as usize;
            let handler = &handlers[(key | u32::from(cells[pos])) as usize];
            key = handler.next_key;
            if let Some(symbol) = handler.write {
                cells[pos] = symbol;
            }
            match handler.step {
                Step::Stay => {}
                Step::Left => x = L::shift(x, -1, &mut dir_x, width),
                Step::Right => x = L::shift(x, 1, &mut dir_x, width),
                Step::Up => y = L::shift(y, -1, &mut dir_y, height),
                Step::Down => y = L::shift(y, 1, &mut dir_y, height),
            }
        }

        head.state = (key >> bits) as StateId;
        head.x = x;
        head.y = y;
        head.dir_x = dir_x;
        head.dir_y = dir_y;
    }
}

/// Listing of the generated dispatch, one line per reachable case.
impl fmt::Display for Routine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "dispatch symbol | state << {} ({} states x {} symbols, {}x{}, {})",
            self.symbol_bits,
            self.num_states,
            self.num_symbols,
            self.dims.width(),
            self.dims.height(),
            self.policy
        )?;
        let state_mask = (1u32 << self.symbol_bits) - 1;
        for (key, handler) in self.handlers.iter().enumerate() {
            if !handler.reachable {
                continue;
            }
            let key = key as u32;
            let state = key >> self.symbol_bits;
            let next_state = handler.next_key >> self.symbol_bits;
            write!(f, "  case {}:", key)?;
            if next_state != state {
                write!(f, " state = {};", next_state)?;
            }
            if let Some(symbol) = handler.write {
                write!(f, " write {};", symbol)?;
            }
            let step = match handler.step {
                Step::Stay => "stay",
                Step::Left => "x - 1",
                Step::Right => "x + 1",
                Step::Up => "y - 1",
                Step::Down => "y + 1",
            };
            writeln!(f, " {}  (symbol {})", step, key & state_mask)?;
        }
        Ok(())
    }
}
