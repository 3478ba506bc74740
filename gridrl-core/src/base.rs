//! Core functionalities.
mod agent;
mod env;
mod mdp;
mod policy;
mod replay_buffer;
mod step;
pub use agent::{Agent, AgentKind};
pub use env::Env;
pub use mdp::Mdp;
pub use policy::{Configurable, Policy};
pub use replay_buffer::{ExperienceBufferBase, ReplayBufferBase};
pub use step::{Info, Step, Transition};
