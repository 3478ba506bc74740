#![warn(missing_docs)]
//! Core components for planning and learning agents on grid worlds.
//!
//! This crate is backend-free. It defines how agents and environments talk to each other
//! ([`Env`], [`Step`], [`Transition`], [`Policy`], [`Agent`]), the fully known model
//! consumed by planners ([`Mdp`]), the pieces shared by learners ([`EpsilonGreedy`],
//! [`ReplayMemory`]) and the driver running episodes ([`Trainer`], [`DefaultEvaluator`]).
pub mod error;
pub mod record;
pub mod stats;

mod action;
pub use action::{first_argmax, Action};

mod base;
pub use base::{
    Agent, AgentKind, Configurable, Env, ExperienceBufferBase, Info, Mdp, Policy,
    ReplayBufferBase, Step, Transition,
};

mod explorer;
pub use explorer::EpsilonGreedy;

mod replay_buffer;
pub use replay_buffer::{ReplayMemory, ReplayMemoryConfig};

mod evaluator;
pub use evaluator::{DefaultEvaluator, Evaluator, NullEvaluator};

mod trainer;
pub use trainer::{Sampler, Trainer, TrainerConfig};

#[cfg(test)]
mod dummy;
