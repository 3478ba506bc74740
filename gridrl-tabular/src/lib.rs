#![warn(missing_docs)]
//! Planners and tabular learners.
//!
//! * [`ValueIteration`] and [`PolicyIteration`] compute a policy from a known model
//!   ([`Mdp`](gridrl_core::Mdp)) before acting.
//! * [`QLearning`] and [`MonteCarlo`] estimate action values in a [`QTable`] from
//!   sampled experience, per step and per episode respectively.
//! * [`RandomAgent`] acts uniformly at random.
mod monte_carlo;
mod planning;
mod policy_iteration;
mod q_learning;
mod q_table;
mod random;
mod value_iteration;
pub use monte_carlo::{MonteCarlo, MonteCarloConfig};
pub use policy_iteration::{PolicyIteration, PolicyIterationConfig};
pub use q_learning::{QLearning, QLearningConfig};
pub use q_table::QTable;
pub use random::{RandomAgent, RandomAgentConfig};
pub use value_iteration::{ValueIteration, ValueIterationConfig};
