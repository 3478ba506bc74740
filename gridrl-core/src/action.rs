//! Actions shared by all agents and environments.
use crate::error::GridRlError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// One of the four directional moves on a grid.
///
/// The declaration order is the enumeration order used everywhere an argmax
/// breaks ties: the first action reaching the maximum wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Action {
    /// Move to the previous row.
    Up,

    /// Move to the next row.
    Down,

    /// Move to the previous column.
    Left,

    /// Move to the next column.
    Right,
}

impl Action {
    /// The number of actions.
    pub const COUNT: usize = 4;

    /// All actions in enumeration order.
    pub const ALL: [Action; Action::COUNT] = [Action::Up, Action::Down, Action::Left, Action::Right];

    /// Index of the action in [`Action::ALL`].
    pub fn index(self) -> usize {
        match self {
            Self::Up => 0,
            Self::Down => 1,
            Self::Left => 2,
            Self::Right => 3,
        }
    }

    /// Returns the action at index `ix` of [`Action::ALL`].
    pub fn from_index(ix: usize) -> Option<Self> {
        Self::ALL.get(ix).copied()
    }

    /// Lower-case name of the action.
    pub fn name(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Displacement `(row, col)` caused by the action.
    pub fn delta(self) -> (i64, i64) {
        match self {
            Self::Up => (-1, 0),
            Self::Down => (1, 0),
            Self::Left => (0, -1),
            Self::Right => (0, 1),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = GridRlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .find(|a| a.name() == lower)
            .copied()
            .ok_or_else(|| GridRlError::UnknownAction(s.to_string()))
    }
}

/// Index of the first maximum of `values`.
///
/// Ties go to the smallest index. `values` must not be empty.
pub fn first_argmax<T: PartialOrd + Copy>(values: &[T]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}
