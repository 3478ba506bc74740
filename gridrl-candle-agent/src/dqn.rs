//! DQN agent.
mod base;
mod checkpoint;
mod config;
mod model;
pub use base::{Dqn, CHECKPOINT_FILE};
pub use checkpoint::EPSILON_KEY;
pub use config::DqnConfig;
pub use model::{DqnModel, DqnModelConfig};
