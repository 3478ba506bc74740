//! Fully known model of a deterministic environment.
use crate::Action;
use std::{fmt::Debug, hash::Hash};

/// A finite deterministic Markov decision process.
///
/// Planners compute their policy from this model without sampling an environment.
pub trait Mdp {
    /// State of the process.
    type State: Clone + Eq + Hash + Debug;

    /// All states in a stable order.
    fn states(&self) -> Vec<Self::State>;

    /// Returns `true` if `state` ends an episode.
    fn is_terminal(&self, state: &Self::State) -> bool;

    /// Next state and reward of taking `action` in `state`.
    fn transition(&self, state: &Self::State, action: Action) -> (Self::State, f64);

    /// Actions available in every state.
    fn actions(&self) -> &[Action] {
        &Action::ALL
    }
}
