//! Turmite Engine — Engine
//!
//! Owns the table, the simulation state and the cached specialized
//! routine. Any change to the table, grid dimensions or movement policy
//! drops the routine; the next `advance` rebuilds it before running.

use tracing::debug;

use crate::arithmetic::checked_iterations;
use crate::commands::Command;
use crate::domain::{Action, GridDims, HeadState, MovementPolicy};
use crate::error::{EngineError, EngineResult};
use crate::invariants::try_validate_invariants;
use crate::specialize::{specialize, Routine};
use crate::state::{create_initial_state, Frame, GridView, SimulationState};
use crate::transitions::TransitionTable;

/// A single turmite simulation.
#[derive(Debug, Clone)]
pub struct Engine {
    table: TransitionTable,
    policy: MovementPolicy,
    state: SimulationState,
    routine: Option<Routine>,
}

impl Engine {
    /// Fresh simulation: blank grid, head centred, nothing specialized yet.
    pub fn new(
        table: TransitionTable,
        width: u32,
        height: u32,
        policy: MovementPolicy,
    ) -> EngineResult<Self> {
        let dims = GridDims::new(width, height)?;
        Ok(Self {
            table,
            policy,
            state: create_initial_state(dims),
            routine: None,
        })
    }

    /// Rebuild an engine around restored state. The state must satisfy
    /// every invariant against `table`.
    pub fn from_parts(
        table: TransitionTable,
        policy: MovementPolicy,
        state: SimulationState,
    ) -> EngineResult<Self> {
        try_validate_invariants(&state, &table).map_err(EngineError::InvalidParameter)?;
        Ok(Self {
            table,
            policy,
            state,
            routine: None,
        })
    }

    /// Run exactly `iterations` steps and return the new iteration count.
    ///
    /// Specializes first if needed. If specialization fails nothing has
    /// been stepped and the error is returned. `iterations == 0` is a
    /// no-op and does not specialize.
    pub fn advance(&mut self, iterations: u64) -> EngineResult<u64> {
        if iterations == 0 {
            return Ok(self.state.iterations);
        }
        let total = checked_iterations(self.state.iterations, iterations)?;
        let routine = cached_routine(&mut self.routine, &self.table, self.state.dims, self.policy)?;
        routine.run(&mut self.state, iterations);
        self.state.iterations = total;
        Ok(total)
    }

    /// Build the routine now instead of on the next `advance`.
    pub fn specialize(&mut self) -> EngineResult<&Routine> {
        cached_routine(&mut self.routine, &self.table, self.state.dims, self.policy)
    }

    pub fn is_specialized(&self) -> bool {
        self.routine.is_some()
    }

    /// Blank grid, centred head, zero iterations. Table and routine stay.
    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Edit one table entry. Invalidates the routine if the entry changed.
    pub fn set_transition(
        &mut self,
        state: usize,
        symbol: usize,
        next_state: usize,
        next_symbol: usize,
        action: Action,
    ) -> EngineResult<()> {
        let before = self.table.get_transition(state, symbol)?;
        self.table
            .set_transition(state, symbol, next_state, next_symbol, action)?;
        if self.table.get_transition(state, symbol)? != before {
            self.invalidate("transition edited");
        }
        Ok(())
    }

    /// Swap in a new table and reset, since the old grid and head may
    /// hold symbols or a state the new table does not have.
    pub fn replace_table(&mut self, table: TransitionTable) {
        self.table = table;
        self.state.reset();
        self.invalidate("table replaced");
    }

    /// Swap in a new table on a `width × height` grid and reset.
    pub fn load_table(&mut self, table: TransitionTable, width: u32, height: u32) -> EngineResult<()> {
        let dims = GridDims::new(width, height)?;
        if dims != self.state.dims {
            self.state = create_initial_state(dims);
        }
        self.replace_table(table);
        Ok(())
    }

    /// Reallocate the grid at new dimensions and reset.
    pub fn resize(&mut self, width: u32, height: u32) -> EngineResult<()> {
        let dims = GridDims::new(width, height)?;
        if dims == self.state.dims {
            self.state.reset();
            return Ok(());
        }
        self.state = create_initial_state(dims);
        self.invalidate("grid resized");
        Ok(())
    }

    pub fn set_policy(&mut self, policy: MovementPolicy) {
        if policy != self.policy {
            self.policy = policy;
            self.invalidate("movement policy changed");
        }
    }

    /// Execute one command. Returns the iteration count afterwards.
    pub fn apply(&mut self, command: &Command) -> EngineResult<u64> {
        match command {
            Command::LoadTable {
                table,
                width,
                height,
            } => self.load_table(table.clone(), *width, *height)?,
            Command::SetTransition {
                state,
                symbol,
                next_state,
                next_symbol,
                action,
            } => self.set_transition(*state, *symbol, *next_state, *next_symbol, *action)?,
            Command::SetPolicy(policy) => self.set_policy(*policy),
            Command::Advance { iterations } => return self.advance(*iterations),
            Command::Reset => self.reset(),
            Command::Resize { width, height } => self.resize(*width, *height)?,
        }
        Ok(self.state.iterations)
    }

    // ── Read access ───────────────────────────────────────────────

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    pub fn policy(&self) -> MovementPolicy {
        self.policy
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn dims(&self) -> GridDims {
        self.state.dims
    }

    pub fn head(&self) -> HeadState {
        self.state.head
    }

    pub fn iteration_count(&self) -> u64 {
        self.state.iterations
    }

    /// Borrowed view of the grid. Lives no longer than the next mutation.
    pub fn grid(&self) -> GridView<'_> {
        self.state.view()
    }

    /// Owned copy for a renderer that runs alongside the simulation.
    pub fn frame(&self) -> Frame {
        self.state.frame()
    }

    /// Share string of the current table.
    pub fn share_string(&self) -> String {
        self.table.serialize()
    }

    fn invalidate(&mut self, reason: &str) {
        if self.routine.take().is_some() {
            debug!(reason, "dropped specialized routine");
        }
    }
}

fn cached_routine<'a>(
    slot: &'a mut Option<Routine>,
    table: &TransitionTable,
    dims: GridDims,
    policy: MovementPolicy,
) -> EngineResult<&'a Routine> {
    let routine = match slot.take() {
        Some(routine) => routine,
        None => specialize(table, dims.width(), dims.height(), policy)?,
    };
    Ok(&*slot.insert(routine))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GenerationOptions, Symbol};
    use crate::invariants::validate_invariants;

    /// Table-lookup interpreter used as ground truth for the routine.
    fn reference_run(engine: &Engine, iterations: u64) -> (Vec<Symbol>, HeadState) {
        let dims = engine.dims();
        let (w, h) = (dims.width() as i32, dims.height() as i32);
        let mut cells = engine.grid().cells().to_vec();
        let mut head = engine.head();
        for _ in 0..iterations {
            let pos = (head.y * dims.width() + head.x) as usize;
            let t = engine
                .table()
                .get_transition(head.state as usize, cells[pos] as usize)
                .unwrap();
            head.state = t.next_state;
            cells[pos] = t.next_symbol;
            let (dx, dy) = t.action.delta();
            if dx != 0 {
                let (x, dir) = reference_axis(engine.policy(), head.x as i32, dx, head.dir_x, w);
                head.x = x;
                head.dir_x = dir;
            }
            if dy != 0 {
                let (y, dir) = reference_axis(engine.policy(), head.y as i32, dy, head.dir_y, h);
                head.y = y;
                head.dir_y = dir;
            }
        }
        (cells, head)
    }

    fn reference_axis(policy: MovementPolicy, pos: i32, d: i32, dir: i8, n: i32) -> (u32, i8) {
        match policy {
            MovementPolicy::Wrap => (((pos + d) % n + n) as u32 % n as u32, dir),
            MovementPolicy::Clamp => ((pos + d).max(0).min(n - 1) as u32, dir),
            MovementPolicy::Recenter => {
                let p = pos + d;
                if p < 0 || p >= n {
                    ((n / 2) as u32, dir)
                } else {
                    (p as u32, dir)
                }
            }
            MovementPolicy::Bounce => {
                let p = pos + d * dir as i32;
                if p < 0 || p >= n {
                    let flipped = -dir;
                    ((pos + d * flipped as i32) as u32, flipped)
                } else {
                    (p as u32, dir)
                }
            }
        }
    }

    fn scenario_table() -> TransitionTable {
        let mut table = TransitionTable::new(1, 2).unwrap();
        table.set_transition(0, 0, 0, 1, Action::Right).unwrap();
        table.set_transition(0, 1, 0, 1, Action::Stay).unwrap();
        table
    }

    fn engine_with_head(table: TransitionTable, x: u32, y: u32) -> Engine {
        let dims = GridDims::new(8, 8).unwrap();
        let mut state = create_initial_state(dims);
        state.head.x = x;
        state.head.y = y;
        Engine::from_parts(table, MovementPolicy::Wrap, state).unwrap()
    }

    fn single_move(action: Action) -> TransitionTable {
        let mut table = TransitionTable::new(1, 2).unwrap();
        table.set_transition(0, 0, 0, 0, action).unwrap();
        table
    }

    #[test]
    fn test_scenario_one_state_two_symbols() {
        let mut engine = Engine::new(scenario_table(), 8, 8, MovementPolicy::Wrap).unwrap();
        assert_eq!(engine.advance(1).unwrap(), 1);
        assert_eq!(engine.grid().get(4, 4), Some(1));
        assert_eq!((engine.head().x, engine.head().y), (5, 4));
        assert_eq!(engine.head().state, 0);

        engine.advance(1).unwrap();
        assert_eq!(engine.grid().get(5, 4), Some(1));
        assert_eq!((engine.head().x, engine.head().y), (6, 4));
        assert_eq!(engine.head().state, 0);

        // Wraps around the row, hits the first inked cell and stays.
        engine.advance(100).unwrap();
        assert_eq!((engine.head().x, engine.head().y), (4, 4));
        assert_eq!(engine.grid().row(4).unwrap(), &[1u8; 8][..]);
        assert_eq!(engine.grid().inked(), 8);
        assert_eq!(engine.iteration_count(), 102);
    }

    #[test]
    fn test_wraparound_8x8() {
        let mut engine = engine_with_head(single_move(Action::Left), 0, 3);
        engine.advance(1).unwrap();
        assert_eq!((engine.head().x, engine.head().y), (7, 3));

        let mut engine = engine_with_head(single_move(Action::Right), 7, 3);
        engine.advance(1).unwrap();
        assert_eq!((engine.head().x, engine.head().y), (0, 3));

        let mut engine = engine_with_head(single_move(Action::Up), 2, 0);
        engine.advance(1).unwrap();
        assert_eq!((engine.head().x, engine.head().y), (2, 7));

        let mut engine = engine_with_head(single_move(Action::Down), 2, 7);
        engine.advance(1).unwrap();
        assert_eq!((engine.head().x, engine.head().y), (2, 0));
    }

    #[test]
    fn test_bounce_walks_back_and_forth() {
        let mut engine = Engine::new(single_move(Action::Right), 8, 8, MovementPolicy::Bounce).unwrap();
        // 4 -> 7 takes 3 steps, the 4th reflects to 6.
        engine.advance(4).unwrap();
        assert_eq!(engine.head().x, 6);
        assert_eq!(engine.head().dir_x, -1);
        // 6 -> 0 takes 6 steps, the next reflects to 1.
        engine.advance(7).unwrap();
        assert_eq!(engine.head().x, 1);
        assert_eq!(engine.head().dir_x, 1);
        validate_invariants(engine.state(), engine.table());
    }

    #[test]
    fn test_clamp_and_recenter() {
        let mut engine = Engine::new(single_move(Action::Up), 8, 8, MovementPolicy::Clamp).unwrap();
        engine.advance(20).unwrap();
        assert_eq!(engine.head().y, 0);

        let mut engine = Engine::new(single_move(Action::Up), 8, 8, MovementPolicy::Recenter).unwrap();
        engine.advance(4).unwrap();
        assert_eq!(engine.head().y, 0);
        engine.advance(1).unwrap();
        assert_eq!(engine.head().y, 4);
    }

    #[test]
    fn test_routine_matches_reference_interpreter() {
        for policy in MovementPolicy::ALL {
            for seed in 0..6u64 {
                let states = 1 + seed as usize % 4;
                let symbols = 2 + seed as usize % 3;
                let table = TransitionTable::random_seeded(
                    states,
                    symbols,
                    GenerationOptions::default(),
                    seed,
                )
                .unwrap();
                let mut engine = Engine::new(table, 16, 8, policy).unwrap();
                engine.advance(37).unwrap();
                let (cells, head) = reference_run(&engine, 500);
                engine.advance(500).unwrap();
                assert_eq!(engine.grid().cells(), &cells[..], "{} seed {}", policy, seed);
                assert_eq!(engine.head(), head, "{} seed {}", policy, seed);
                validate_invariants(engine.state(), engine.table());
            }
        }
    }

    #[test]
    fn test_step_count_additivity() {
        let table =
            TransitionTable::random_seeded(3, 4, GenerationOptions::default(), 99).unwrap();
        for (a, b) in [(0, 0), (0, 17), (1, 1), (250, 750), (999, 1)] {
            let mut split = Engine::new(table.clone(), 32, 32, MovementPolicy::Wrap).unwrap();
            split.advance(a).unwrap();
            split.advance(b).unwrap();
            let mut whole = Engine::new(table.clone(), 32, 32, MovementPolicy::Wrap).unwrap();
            whole.advance(a + b).unwrap();
            assert_eq!(split.frame(), whole.frame());
        }
    }

    #[test]
    fn test_reset_is_idempotent() {
        let table =
            TransitionTable::random_seeded(2, 3, GenerationOptions::default(), 5).unwrap();
        let mut engine = Engine::new(table, 16, 16, MovementPolicy::Wrap).unwrap();
        let fresh = engine.frame();
        engine.advance(1000).unwrap();
        engine.reset();
        let once = engine.frame();
        engine.reset();
        assert_eq!(engine.frame(), once);
        assert_eq!(once, fresh);
        assert_eq!(engine.iteration_count(), 0);
        assert!(engine.is_specialized(), "reset keeps the routine");
    }

    #[test]
    fn test_zero_iterations_is_noop() {
        let mut engine = Engine::new(scenario_table(), 8, 8, MovementPolicy::Wrap).unwrap();
        assert_eq!(engine.advance(0).unwrap(), 0);
        assert!(!engine.is_specialized());
        engine.advance(3).unwrap();
        assert_eq!(engine.advance(0).unwrap(), 3);
        assert!(engine.is_specialized());
    }

    #[test]
    fn test_structural_changes_invalidate() {
        let mut engine = Engine::new(scenario_table(), 8, 8, MovementPolicy::Wrap).unwrap();
        engine.specialize().unwrap();

        engine.set_transition(0, 1, 0, 1, Action::Stay).unwrap();
        assert!(engine.is_specialized(), "unchanged entry keeps the routine");
        engine.set_transition(0, 1, 0, 0, Action::Left).unwrap();
        assert!(!engine.is_specialized());

        engine.advance(1).unwrap();
        engine.set_policy(MovementPolicy::Wrap);
        assert!(engine.is_specialized());
        engine.set_policy(MovementPolicy::Clamp);
        assert!(!engine.is_specialized());

        engine.advance(1).unwrap();
        engine.resize(16, 8).unwrap();
        assert!(!engine.is_specialized());
        assert_eq!(engine.dims().width(), 16);
        assert_eq!(engine.iteration_count(), 0);

        engine.advance(1).unwrap();
        engine.replace_table(TransitionTable::new(2, 2).unwrap());
        assert!(!engine.is_specialized());
        assert_eq!(engine.routine_dims_after_advance(), engine.dims());
    }

    #[test]
    fn test_edit_changes_behaviour_after_rebuild() {
        let mut engine = Engine::new(scenario_table(), 8, 8, MovementPolicy::Wrap).unwrap();
        engine.advance(1).unwrap();
        engine.set_transition(0, 0, 0, 1, Action::Down).unwrap();
        engine.advance(1).unwrap();
        assert_eq!((engine.head().x, engine.head().y), (5, 5));
    }

    #[test]
    fn test_failed_edit_leaves_engine_untouched() {
        let mut engine = Engine::new(scenario_table(), 8, 8, MovementPolicy::Wrap).unwrap();
        engine.advance(2).unwrap();
        let before = engine.frame();
        assert!(matches!(
            engine.set_transition(0, 2, 0, 0, Action::Left),
            Err(EngineError::OutOfRange(_))
        ));
        assert!(engine.resize(12, 8).is_err());
        assert!(engine.is_specialized());
        assert_eq!(engine.frame(), before);
    }

    #[test]
    fn test_constructor_rejects_bad_dims() {
        assert!(matches!(
            Engine::new(scenario_table(), 8, 6, MovementPolicy::Wrap),
            Err(EngineError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_from_parts_validates() {
        let dims = GridDims::new(8, 8).unwrap();
        let mut state = create_initial_state(dims);
        state.cells[0] = 9;
        assert!(matches!(
            Engine::from_parts(scenario_table(), MovementPolicy::Wrap, state),
            Err(EngineError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_apply_commands() {
        let mut engine = Engine::new(scenario_table(), 8, 8, MovementPolicy::Wrap).unwrap();
        let commands = [
            Command::Advance { iterations: 3 },
            Command::SetPolicy(MovementPolicy::Bounce),
            Command::Advance { iterations: 2 },
            Command::Reset,
            Command::Resize {
                width: 4,
                height: 4,
            },
            Command::SetTransition {
                state: 0,
                symbol: 0,
                next_state: 0,
                next_symbol: 1,
                action: Action::Up,
            },
            Command::Advance { iterations: 1 },
        ];
        let mut last = 0;
        for command in &commands {
            last = engine.apply(command).unwrap();
            if command.invalidates_routine() {
                assert!(!engine.is_specialized(), "{}", command.kind());
            }
        }
        assert_eq!(last, 1);
        assert_eq!(engine.policy(), MovementPolicy::Bounce);
        assert_eq!((engine.head().x, engine.head().y), (2, 1));

        let load = Command::LoadTable {
            table: TransitionTable::new(3, 2).unwrap(),
            width: 32,
            height: 16,
        };
        assert_eq!(engine.apply(&load).unwrap(), 0);
        assert_eq!(engine.table().num_states(), 3);
        assert_eq!((engine.head().x, engine.head().y), (16, 8));
    }

    #[test]
    fn test_iteration_overflow_is_rejected_before_running() {
        let mut engine = Engine::new(scenario_table(), 8, 8, MovementPolicy::Wrap).unwrap();
        engine.state.iterations = u64::MAX - 1;
        let before = engine.frame();
        assert!(engine.advance(2).is_err());
        assert_eq!(engine.frame(), before);
    }

    impl Engine {
        fn routine_dims_after_advance(&mut self) -> GridDims {
            self.advance(1).unwrap();
            self.routine.as_ref().unwrap().dims()
        }
    }
}
