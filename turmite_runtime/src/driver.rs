//! Frame driver — paces an engine for interactive display.
//!
//! Each frame advances in batches of at most `max_batch` until either the
//! current speed's worth of iterations has run or the frame budget is
//! spent, whichever comes first. At least one batch always runs.

use std::time::{Duration, Instant};

use tracing::trace;

use turmite_engine::{Engine, EngineResult};

use crate::config::RunConfig;

/// Iterations per frame, slowest to fastest.
pub const SPEEDS: [u64; 14] = [
    1, 3, 10, 33, 100, 333, 1_000, 3_333, 10_000, 33_333, 100_000, 350_000, 1_000_000, 3_500_000,
];

/// Fastest speed at which the head is still worth highlighting.
pub const HEAD_MARKER_MAX_SPEED: u64 = 1_000;

/// What one frame did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub iterations: u64,
    pub batches: u32,
    pub elapsed: Duration,
    /// Iteration count after the frame.
    pub total_iterations: u64,
    pub show_head: bool,
}

#[derive(Debug, Clone)]
pub struct Driver {
    speed_index: usize,
    frame_budget: Duration,
    max_batch: u64,
}

impl Driver {
    pub fn new(iterations_per_frame: u64, frame_budget: Duration, max_batch: u64) -> Self {
        Self {
            speed_index: ladder_index(iterations_per_frame),
            frame_budget,
            max_batch: max_batch.max(1),
        }
    }

    pub fn from_config(cfg: &RunConfig) -> Self {
        Self::new(
            cfg.iterations_per_frame,
            Duration::from_millis(cfg.frame_budget_ms),
            cfg.max_batch,
        )
    }

    pub fn speed(&self) -> u64 {
        SPEEDS[self.speed_index]
    }

    /// One step up the ladder. Stays at the top.
    pub fn faster(&mut self) -> u64 {
        if self.speed_index + 1 < SPEEDS.len() {
            self.speed_index += 1;
        }
        self.speed()
    }

    /// One step down the ladder. Stays at the bottom.
    pub fn slower(&mut self) -> u64 {
        self.speed_index = self.speed_index.saturating_sub(1);
        self.speed()
    }

    pub fn run_frame(&self, engine: &mut Engine) -> EngineResult<FrameReport> {
        let speed = self.speed();
        let batch = speed.min(self.max_batch);
        let start = Instant::now();
        let mut ran = 0u64;
        let mut batches = 0u32;

        loop {
            let step = batch.min(speed - ran);
            engine.advance(step)?;
            ran += step;
            batches += 1;
            if ran >= speed || start.elapsed() >= self.frame_budget {
                break;
            }
        }

        let report = FrameReport {
            iterations: ran,
            batches,
            elapsed: start.elapsed(),
            total_iterations: engine.iteration_count(),
            show_head: speed <= HEAD_MARKER_MAX_SPEED,
        };
        trace!(?report, "frame");
        Ok(report)
    }
}

/// First ladder position at or above `iterations`, else the top.
fn ladder_index(iterations: u64) -> usize {
    SPEEDS
        .iter()
        .position(|&s| s >= iterations)
        .unwrap_or(SPEEDS.len() - 1)
}
