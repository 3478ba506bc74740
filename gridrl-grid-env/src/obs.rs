//! Observations of [`GridEnv`](crate::GridEnv).
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

/// A cell of the grid, `(row, col)`, the origin being the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct GridPos {
    /// Row index.
    pub row: usize,

    /// Column index.
    pub col: usize,
}

impl GridPos {
    /// Constructs a position.
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl From<(usize, usize)> for GridPos {
    fn from((row, col): (usize, usize)) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Numeric features of a grid state, `[row, col, goal_row, goal_col]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Features(pub [f32; 4]);

impl From<Features> for Vec<f32> {
    fn from(f: Features) -> Self {
        f.0.to_vec()
    }
}

/// Converts the state of the grid into an observation.
pub trait ObsFilter: Default {
    /// Observation.
    type Obs: Clone + Debug;

    /// Observation of the agent at `agent` with the goals of the current episode.
    fn filt(&self, agent: GridPos, goals: &[GridPos]) -> Self::Obs;
}

/// Observes the position of the agent only.
///
/// Suited to tabular agents, the observation being hashable.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionFilter;

impl ObsFilter for PositionFilter {
    type Obs = GridPos;

    fn filt(&self, agent: GridPos, _goals: &[GridPos]) -> GridPos {
        agent
    }
}

/// Observes the position of the agent and of the first goal as [`Features`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureFilter;

impl ObsFilter for FeatureFilter {
    type Obs = Features;

    fn filt(&self, agent: GridPos, goals: &[GridPos]) -> Features {
        let goal = goals.first().copied().unwrap_or(agent);
        Features([
            agent.row as f32,
            agent.col as f32,
            goal.row as f32,
            goal.col as f32,
        ])
    }
}
