//! Turmite Engine — Simulation State
//!
//! Grid cells, head registers and the iteration counter.
//! One byte per cell; row-major with `index = y << log_width | x`.

use crate::domain::{GridDims, HeadState, Symbol};

/// Mutable state owned by exactly one engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationState {
    pub(crate) dims: GridDims,
    pub(crate) cells: Vec<Symbol>,
    pub(crate) head: HeadState,
    pub(crate) iterations: u64,
}

/// Blank grid, head centred in state 0, zero iterations.
pub fn create_initial_state(dims: GridDims) -> SimulationState {
    SimulationState {
        dims,
        cells: vec![0; dims.cell_count()],
        head: HeadState::initial(dims),
        iterations: 0,
    }
}

impl SimulationState {
    /// Assemble a state from restored parts. Not validated here; see
    /// `invariants::try_validate_invariants`.
    pub fn from_parts(dims: GridDims, cells: Vec<Symbol>, head: HeadState, iterations: u64) -> Self {
        Self {
            dims,
            cells,
            head,
            iterations,
        }
    }

    /// Back to the initial configuration. Keeps the allocation.
    pub fn reset(&mut self) {
        self.cells.fill(0);
        self.head = HeadState::initial(self.dims);
        self.iterations = 0;
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    pub fn head(&self) -> HeadState {
        self.head
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn cells(&self) -> &[Symbol] {
        &self.cells
    }

    pub fn view(&self) -> GridView<'_> {
        GridView {
            dims: self.dims,
            cells: &self.cells,
        }
    }

    /// Owned point-in-time copy.
    pub fn frame(&self) -> Frame {
        Frame {
            dims: self.dims,
            cells: self.cells.clone(),
            head: self.head,
            iterations: self.iterations,
        }
    }
}

/// Borrowed read-only view of the grid.
#[derive(Debug, Clone, Copy)]
pub struct GridView<'a> {
    dims: GridDims,
    cells: &'a [Symbol],
}

impl<'a> GridView<'a> {
    pub fn dims(&self) -> GridDims {
        self.dims
    }

    pub fn width(&self) -> u32 {
        self.dims.width()
    }

    pub fn height(&self) -> u32 {
        self.dims.height()
    }

    pub fn cells(&self) -> &'a [Symbol] {
        self.cells
    }

    /// Symbol at `(x, y)`, `None` outside the grid.
    pub fn get(&self, x: u32, y: u32) -> Option<Symbol> {
        self.dims
            .contains(x, y)
            .then(|| self.cells[self.dims.index(x, y)])
    }

    pub fn row(&self, y: u32) -> Option<&'a [Symbol]> {
        if y >= self.dims.height() {
            return None;
        }
        let start = self.dims.index(0, y);
        Some(&self.cells[start..start + self.dims.width() as usize])
    }

    /// Number of cells holding a non-blank symbol.
    pub fn inked(&self) -> usize {
        self.cells.iter().filter(|&&c| c != 0).count()
    }
}

/// Owned snapshot taken at a batch boundary. Safe to hand to a renderer
/// on another thread while the engine keeps running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub dims: GridDims,
    pub cells: Vec<Symbol>,
    pub head: HeadState,
    pub iterations: u64,
}

impl Frame {
    pub fn view(&self) -> GridView<'_> {
        GridView {
            dims: self.dims,
            cells: &self.cells,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let dims = GridDims::new(16, 8).unwrap();
        let state = create_initial_state(dims);
        assert_eq!(state.cells().len(), 128);
        assert!(state.cells().iter().all(|&c| c == 0));
        assert_eq!((state.head().x, state.head().y), (8, 4));
        assert_eq!(state.head().state, 0);
        assert_eq!((state.head().dir_x, state.head().dir_y), (1, 1));
        assert_eq!(state.iterations(), 0);
    }

    #[test]
    fn test_reset_keeps_allocation() {
        let dims = GridDims::new(8, 8).unwrap();
        let mut state = create_initial_state(dims);
        state.cells[5] = 3;
        state.head.x = 1;
        state.head.state = 2;
        state.iterations = 99;
        let ptr = state.cells.as_ptr();
        state.reset();
        assert_eq!(state.cells.as_ptr(), ptr);
        assert_eq!(state, create_initial_state(dims));
    }

    #[test]
    fn test_view_accessors() {
        let dims = GridDims::new(4, 2).unwrap();
        let mut state = create_initial_state(dims);
        state.cells[dims.index(3, 1)] = 2;
        let view = state.view();
        assert_eq!(view.get(3, 1), Some(2));
        assert_eq!(view.get(4, 0), None);
        assert_eq!(view.row(1), Some(&[0, 0, 0, 2][..]));
        assert_eq!(view.row(2), None);
        assert_eq!(view.inked(), 1);
    }

    #[test]
    fn test_frame_is_detached() {
        let dims = GridDims::new(4, 4).unwrap();
        let mut state = create_initial_state(dims);
        let frame = state.frame();
        state.cells[0] = 1;
        assert_eq!(frame.cells[0], 0);
        assert_eq!(frame.view().inked(), 0);
    }
}
