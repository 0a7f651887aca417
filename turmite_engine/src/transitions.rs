//! Turmite Engine — Transition Table
//!
//! Total function `(state, symbol) -> (next state, next symbol, action)`.
//! Entries are stored symbol-major: index `symbol * num_states + state`.
//! The share string flattens the same order:
//!
//!   num_states,num_symbols,s0,y0,a0,s1,y1,a1,...

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::arithmetic::{dimension_log2, MAX_STATES, MAX_SYMBOLS};
use crate::domain::{Action, GenerationOptions, StateId, Symbol, Transition};
use crate::error::{EngineError, EngineResult};

/// Dense transition table. Every `(state, symbol)` pair has an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransitionTable {
    num_states: usize,
    num_symbols: usize,
    entries: Vec<Transition>,
}

impl TransitionTable {
    /// Build a table with every entry set to `(0, 0, STAY)`.
    pub fn new(num_states: usize, num_symbols: usize) -> EngineResult<Self> {
        if !(1..=MAX_STATES).contains(&num_states) {
            return Err(EngineError::InvalidParameter(format!(
                "num_states {} outside [1, {}]",
                num_states, MAX_STATES
            )));
        }
        if !(2..=MAX_SYMBOLS).contains(&num_symbols) {
            return Err(EngineError::InvalidParameter(format!(
                "num_symbols {} outside [2, {}]",
                num_symbols, MAX_SYMBOLS
            )));
        }
        Ok(Self {
            num_states,
            num_symbols,
            entries: vec![Transition::default(); num_states * num_symbols],
        })
    }

    /// Uniform random table: next state and symbol uniform over their
    /// domains, action uniform over the four moves (never STAY).
    pub fn random<R: Rng + ?Sized>(
        num_states: usize,
        num_symbols: usize,
        options: GenerationOptions,
        rng: &mut R,
    ) -> EngineResult<Self> {
        let mut table = Self::new(num_states, num_symbols)?;
        let lowest_symbol = usize::from(options.ink_bias);
        for symbol in 0..num_symbols {
            for state in 0..num_states {
                let next_state = rng.random_range(0..num_states);
                let next_symbol = rng.random_range(lowest_symbol..num_symbols);
                let action = Action::MOVES[rng.random_range(0..Action::MOVES.len())];
                table.set_transition(state, symbol, next_state, next_symbol, action)?;
            }
        }
        Ok(table)
    }

    /// Reproducible random table from a 64-bit seed.
    pub fn random_seeded(
        num_states: usize,
        num_symbols: usize,
        options: GenerationOptions,
        seed: u64,
    ) -> EngineResult<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::random(num_states, num_symbols, options, &mut rng)
    }

    /// Build from flattened `(next_state, next_symbol, action)` triples in
    /// symbol-major order. Every failure is `MalformedInput`.
    pub fn from_triples(
        num_states: usize,
        num_symbols: usize,
        triples: &[u64],
    ) -> EngineResult<Self> {
        let mut table = Self::new(num_states, num_symbols)
            .map_err(|e| EngineError::MalformedInput(e.to_string()))?;
        let expected = num_states * num_symbols * 3;
        if triples.len() != expected {
            return Err(EngineError::MalformedInput(format!(
                "expected {} transition fields, got {}",
                expected,
                triples.len()
            )));
        }
        for (i, chunk) in triples.chunks_exact(3).enumerate() {
            let (next_state, next_symbol, code) = (chunk[0], chunk[1], chunk[2]);
            if next_state >= num_states as u64 {
                return Err(EngineError::MalformedInput(format!(
                    "entry {}: next state {} >= {}",
                    i, next_state, num_states
                )));
            }
            if next_symbol >= num_symbols as u64 {
                return Err(EngineError::MalformedInput(format!(
                    "entry {}: next symbol {} >= {}",
                    i, next_symbol, num_symbols
                )));
            }
            let action = Action::from_code(code).ok_or_else(|| {
                EngineError::MalformedInput(format!("entry {}: invalid action code {}", i, code))
            })?;
            table.entries[i] = Transition {
                next_state: next_state as StateId,
                next_symbol: next_symbol as Symbol,
                action,
            };
        }
        Ok(table)
    }

    /// Parse a share string for a grid of `width × height`.
    ///
    /// Dimension problems are `InvalidParameter`; anything wrong with the
    /// string itself is `MalformedInput`.
    pub fn deserialize(input: &str, width: u32, height: u32) -> EngineResult<Self> {
        dimension_log2("width", width)?;
        dimension_log2("height", height)?;
        input.parse()
    }

    /// Canonical share string.
    pub fn serialize(&self) -> String {
        self.to_string()
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    pub fn num_symbols(&self) -> usize {
        self.num_symbols
    }

    pub fn set_transition(
        &mut self,
        state: usize,
        symbol: usize,
        next_state: usize,
        next_symbol: usize,
        action: Action,
    ) -> EngineResult<()> {
        self.check_state("state", state)?;
        self.check_symbol("symbol", symbol)?;
        self.check_state("next_state", next_state)?;
        self.check_symbol("next_symbol", next_symbol)?;
        let idx = self.index(state, symbol);
        self.entries[idx] = Transition {
            next_state: next_state as StateId,
            next_symbol: next_symbol as Symbol,
            action,
        };
        Ok(())
    }

    pub fn get_transition(&self, state: usize, symbol: usize) -> EngineResult<Transition> {
        self.check_state("state", state)?;
        self.check_symbol("symbol", symbol)?;
        Ok(self.entries[self.index(state, symbol)])
    }

    /// Every entry as `(state, symbol, transition)`, in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, Transition)> + '_ {
        let num_states = self.num_states;
        self.entries
            .iter()
            .enumerate()
            .map(move |(i, t)| (i % num_states, i / num_states, *t))
    }

    /// Flattened triples, symbol-major.
    pub fn to_triples(&self) -> Vec<u64> {
        self.entries
            .iter()
            .flat_map(|t| {
                [
                    t.next_state as u64,
                    t.next_symbol as u64,
                    t.action.code() as u64,
                ]
            })
            .collect()
    }

    fn index(&self, state: usize, symbol: usize) -> usize {
        symbol * self.num_states + state
    }

    fn check_state(&self, what: &str, value: usize) -> EngineResult<()> {
        if value >= self.num_states {
            return Err(EngineError::OutOfRange(format!(
                "{} {} >= num_states {}",
                what, value, self.num_states
            )));
        }
        Ok(())
    }

    fn check_symbol(&self, what: &str, value: usize) -> EngineResult<()> {
        if value >= self.num_symbols {
            return Err(EngineError::OutOfRange(format!(
                "{} {} >= num_symbols {}",
                what, value, self.num_symbols
            )));
        }
        Ok(())
    }
}

impl fmt::Display for TransitionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.num_states, self.num_symbols)?;
        for t in &self.entries {
            write!(f, ",{},{},{}", t.next_state, t.next_symbol, t.action.code())?;
        }
        Ok(())
    }
}

impl FromStr for TransitionTable {
    type Err = EngineError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let fields = input
            .split(',')
            .map(|tok| {
                tok.trim().parse::<u64>().map_err(|_| {
                    EngineError::MalformedInput(format!("non-numeric field {:?}", tok.trim()))
                })
            })
            .collect::<EngineResult<Vec<u64>>>()?;

        if fields.len() < 2 {
            return Err(EngineError::MalformedInput(format!(
                "expected at least 2 header fields, got {}",
                fields.len()
            )));
        }
        let num_states = fields[0];
        let num_symbols = fields[1];
        if !(1..=MAX_STATES as u64).contains(&num_states)
            || !(2..=MAX_SYMBOLS as u64).contains(&num_symbols)
        {
            return Err(EngineError::MalformedInput(format!(
                "unsupported table size {} states x {} symbols",
                num_states, num_symbols
            )));
        }
        let expected = 2 + (num_states * num_symbols * 3) as usize;
        if fields.len() != expected {
            return Err(EngineError::MalformedInput(format!(
                "expected {} fields for {} states x {} symbols, got {}",
                expected,
                num_states,
                num_symbols,
                fields.len()
            )));
        }
        Self::from_triples(num_states as usize, num_symbols as usize, &fields[2..])
    }
}
