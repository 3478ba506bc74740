//! Environment.
use super::{Info, Step};
use crate::Action;
use anyhow::Result;
use std::fmt::Debug;

/// Represents an environment, typically an MDP over a discrete grid.
///
/// An episode starts with [`Env::reset`] and ends when a [`Step`] reports
/// termination or truncation. Stepping an environment whose episode is over
/// fails with [`GridRlError::EpisodeFinished`] until the next reset.
///
/// [`GridRlError::EpisodeFinished`]: crate::error::GridRlError::EpisodeFinished
pub trait Env {
    /// Configurations.
    type Config: Clone;

    /// Observation of the environment.
    type Obs: Clone + Debug;

    /// Information in the [`Step`] object.
    type Info: Info;

    /// Builds an environment with a given random seed.
    fn build(config: &Self::Config, seed: i64) -> Result<Self>
    where
        Self: Sized;

    /// Starts a new episode and returns the initial observation.
    fn reset(&mut self) -> Result<(Self::Obs, Self::Info)>;

    /// Starts a new episode determined by the given index.
    ///
    /// The index is used in an arbitrary way. For example, it can be used as a random seed,
    /// which is useful when evaluating a trained agent. Actually, this method is called
    /// in [`DefaultEvaluator`](crate::DefaultEvaluator).
    fn reset_with_index(&mut self, ix: usize) -> Result<(Self::Obs, Self::Info)>;

    /// Applies one action.
    fn step(&mut self, a: Action) -> Result<Step<Self>>
    where
        Self: Sized;

    /// Legal actions, shared by all agents acting on this environment.
    fn action_space(&self) -> &[Action] {
        &Action::ALL
    }
}
