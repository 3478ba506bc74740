//! Planning and learning agents for grid worlds.
//!
//! This crate collects the following crates and runnable examples using them:
//!
//! * [gridrl-core](gridrl_core) provides the traits shared by environments and agents,
//!   the exploration schedule, the replay memory and the [`Trainer`](gridrl_core::Trainer)
//!   running episodes.
//! * [gridrl-grid-env](gridrl_grid_env) is a configurable grid world, together with its
//!   fully known model used by planners.
//! * [gridrl-tabular](gridrl_tabular) includes value iteration, policy iteration,
//!   Q-learning, first-visit Monte Carlo control and a random baseline.
//! * [gridrl-candle-agent](gridrl_candle_agent) includes an agent approximating action
//!   values with a neural network based on [candle](https://crates.io/crates/candle-core).
//!
//! The examples are
//!
//! * `compare_agents`, comparing the tabular agents and the baseline on a 4x4 grid, and
//! * `dqn_gridworld`, training the network agent with and without replay on grids with a
//!   randomly placed goal and testing the saved checkpoints.
pub mod util;
pub use gridrl_candle_agent;
pub use gridrl_core;
pub use gridrl_grid_env;
pub use gridrl_tabular;
