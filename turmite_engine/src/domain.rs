//! Turmite Engine — Core Domain Types
//!
//! Pure data. No stepping logic.
//! Symbols and state ids are one byte each (see `arithmetic` limits).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::arithmetic::dimension_log2;
use crate::error::{EngineError, EngineResult};

/// A tape symbol. 0 is the blank every cell starts with.
pub type Symbol = u8;
/// A machine state id.
pub type StateId = u8;

// ── Actions ────────────────────────────────────────────────────────

/// Head movement performed after a write.
///
/// Wire codes are fixed by the share-string format: LEFT=0, RIGHT=1,
/// UP=2, DOWN=3, STAY=4. UP decreases `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Action {
    Left = 0,
    Right = 1,
    Up = 2,
    Down = 3,
    Stay = 4,
}

impl Action {
    /// The four actions random generation draws from.
    pub const MOVES: [Action; 4] = [Action::Left, Action::Right, Action::Up, Action::Down];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u64) -> Option<Action> {
        match code {
            0 => Some(Action::Left),
            1 => Some(Action::Right),
            2 => Some(Action::Up),
            3 => Some(Action::Down),
            4 => Some(Action::Stay),
            _ => None,
        }
    }

    /// Unit displacement `(dx, dy)`.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Action::Left => (-1, 0),
            Action::Right => (1, 0),
            Action::Up => (0, -1),
            Action::Down => (0, 1),
            Action::Stay => (0, 0),
        }
    }
}

/// Right-hand side of one table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transition {
    pub next_state: StateId,
    pub next_symbol: Symbol,
    pub action: Action,
}

impl Default for Transition {
    fn default() -> Self {
        Self {
            next_state: 0,
            next_symbol: 0,
            action: Action::Stay,
        }
    }
}

// ── Movement policy ────────────────────────────────────────────────

/// What happens when a step would leave the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementPolicy {
    /// Toroidal wraparound.
    #[default]
    Wrap,
    /// Flip the axis direction register and reflect one unit.
    Bounce,
    /// Saturate at the edge.
    Clamp,
    /// Jump back to the centre of the offending axis.
    Recenter,
}

impl MovementPolicy {
    pub const ALL: [MovementPolicy; 4] = [
        MovementPolicy::Wrap,
        MovementPolicy::Bounce,
        MovementPolicy::Clamp,
        MovementPolicy::Recenter,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MovementPolicy::Wrap => "wrap",
            MovementPolicy::Bounce => "bounce",
            MovementPolicy::Clamp => "clamp",
            MovementPolicy::Recenter => "recenter",
        }
    }

    pub fn code(self) -> u32 {
        match self {
            MovementPolicy::Wrap => 0,
            MovementPolicy::Bounce => 1,
            MovementPolicy::Clamp => 2,
            MovementPolicy::Recenter => 3,
        }
    }

    pub fn from_code(code: u32) -> Option<MovementPolicy> {
        MovementPolicy::ALL.get(code as usize).copied()
    }
}

impl fmt::Display for MovementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MovementPolicy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        MovementPolicy::ALL
            .into_iter()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| EngineError::InvalidParameter(format!("unknown movement policy {:?}", s)))
    }
}

// ── Grid geometry ──────────────────────────────────────────────────

/// Validated grid dimensions. Both sides are powers of two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridDims {
    width: u32,
    height: u32,
    log_width: u32,
}

impl GridDims {
    pub fn new(width: u32, height: u32) -> EngineResult<Self> {
        let log_width = dimension_log2("width", width)?;
        dimension_log2("height", height)?;
        Ok(Self {
            width,
            height,
            log_width,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn log_width(&self) -> u32 {
        self.log_width
    }

    pub fn cell_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Starting head position `(width/2, height/2)`.
    pub fn center(&self) -> (u32, u32) {
        (self.width / 2, self.height / 2)
    }

    /// Flat cell index. Caller guarantees `x < width`, `y < height`.
    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        ((y << self.log_width) | x) as usize
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }
}

// ── Head ───────────────────────────────────────────────────────────

/// Head registers. `dir_x`/`dir_y` are only read by the bounce policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeadState {
    pub state: StateId,
    pub x: u32,
    pub y: u32,
    pub dir_x: i8,
    pub dir_y: i8,
}

impl HeadState {
    /// State 0 at the grid centre, both directions +1.
    pub fn initial(dims: GridDims) -> Self {
        let (x, y) = dims.center();
        Self {
            state: 0,
            x,
            y,
            dir_x: 1,
            dir_y: 1,
        }
    }
}

// ── Random generation ──────────────────────────────────────────────

/// Knobs for random table generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Never write the blank symbol, so every visited cell stays inked.
    #[serde(default)]
    pub ink_bias: bool,
}
