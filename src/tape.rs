//! The memory tape.
//!
//! The tape is unbounded in both directions and every position starts out as
//! zero. It is stored as two stacks of already-visited cells around the
//! current one: `left` holds the cells to the left of the head and `right`
//! the cells to its right, each with the nearest cell on top. Moving into
//! territory that was never visited materializes a fresh zero cell, so no
//! movement can ever fail.

use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};

/// A single tape cell. Cells have no fixed width.
pub type Cell = BigInt;

/// How cell arithmetic behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellModel {
    /// Arbitrary-precision integers; increment and decrement never wrap.
    #[default]
    Unbounded,
    /// Values are kept in `[0, 2^bits)` and wrap around on overflow.
    Wrapping { bits: u32 },
}

impl CellModel {
    /// Bring `value` into the range this model allows.
    pub fn normalize(&self, value: Cell) -> Cell {
        match self {
            CellModel::Unbounded => value,
            CellModel::Wrapping { bits } => {
                let modulus = Cell::one() << *bits;
                let rem = value % &modulus;
                if rem.is_negative() { rem + modulus } else { rem }
            }
        }
    }
}

/// An unbounded, bidirectional tape of integer cells.
#[derive(Debug, Clone)]
pub struct Tape {
    current: Cell,
    left: Vec<Cell>,
    right: Vec<Cell>,
    position: i64,
    model: CellModel,
}

impl Default for Tape {
    fn default() -> Self {
        Self::new()
    }
}

impl Tape {
    /// A fresh tape with a single zero cell and unbounded cells.
    pub fn new() -> Self {
        Self::with_model(CellModel::Unbounded)
    }

    pub fn with_model(model: CellModel) -> Self {
        Self {
            current: Cell::zero(),
            left: Vec::new(),
            right: Vec::new(),
            position: 0,
            model,
        }
    }

    /// Offset of the head from where it started.
    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn move_left(&mut self) {
        let next = self.left.pop().unwrap_or_else(Cell::zero);
        let previous = std::mem::replace(&mut self.current, next);
        self.right.push(previous);
        self.position -= 1;
    }

    pub fn move_right(&mut self) {
        let next = self.right.pop().unwrap_or_else(Cell::zero);
        let previous = std::mem::replace(&mut self.current, next);
        self.left.push(previous);
        self.position += 1;
    }

    pub fn get(&self) -> &Cell {
        &self.current
    }

    pub fn set(&mut self, value: Cell) {
        self.current = self.model.normalize(value);
    }

    pub fn increment(&mut self) {
        self.current += 1u32;
        if self.model != CellModel::Unbounded {
            self.current = self.model.normalize(std::mem::take(&mut self.current));
        }
    }

    pub fn decrement(&mut self) {
        self.current -= 1u32;
        if self.model != CellModel::Unbounded {
            self.current = self.model.normalize(std::mem::take(&mut self.current));
        }
    }

    /// Forget everything and go back to a single zero cell at the origin.
    pub fn reset(&mut self) {
        self.current = Cell::zero();
        self.left.clear();
        self.right.clear();
        self.position = 0;
    }

    /// Up to `n` visited cells left of the head, nearest first.
    pub fn left_cells(&self, n: usize) -> impl Iterator<Item = &Cell> {
        self.left.iter().rev().take(n)
    }

    /// Up to `n` visited cells right of the head, nearest first.
    pub fn right_cells(&self, n: usize) -> impl Iterator<Item = &Cell> {
        self.right.iter().rev().take(n)
    }
}
