//! Agent.
use super::{Env, Policy, Transition};
use crate::record::Record;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How an agent learns from experience.
///
/// The [`Trainer`](crate::Trainer) decides which update method to call
/// based on this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum AgentKind {
    /// Computes its policy from a known model before acting. Never updated.
    Planner,

    /// Acts without learning.
    Baseline,

    /// Updated with every transition as soon as it is observed.
    Online,

    /// Updated once per completed episode with the whole episode.
    Episodic,

    /// Stores every transition in a replay memory and learns from samples of it.
    Replay,
}

impl AgentKind {
    /// Returns `true` if the agent changes from experience.
    pub fn is_learner(&self) -> bool {
        matches!(self, Self::Online | Self::Episodic | Self::Replay)
    }
}

/// Represents a trainable policy on an environment.
pub trait Agent<E: Env>: Policy<E> {
    /// How the agent learns.
    fn kind(&self) -> AgentKind;

    /// Set the policy to training mode.
    fn train(&mut self);

    /// Set the policy to evaluation mode.
    ///
    /// Learners act greedily in evaluation mode.
    fn eval(&mut self);

    /// Return if it is in training mode.
    fn is_train(&self) -> bool;

    /// Learns from a single transition.
    ///
    /// Called after every environment step for [`AgentKind::Online`] and
    /// [`AgentKind::Replay`] agents.
    #[allow(unused_variables)]
    fn update(&mut self, tr: &Transition<E::Obs>) -> Result<Option<Record>> {
        Ok(None)
    }

    /// Learns from a complete episode.
    ///
    /// Called once per episode for [`AgentKind::Episodic`] agents.
    #[allow(unused_variables)]
    fn update_episode(&mut self, episode: &[Transition<E::Obs>]) -> Result<Option<Record>> {
        Ok(None)
    }

    /// Called once after every completed training episode.
    fn end_episode(&mut self) {}

    /// Some scalars describing the learning state, like the exploration rate.
    fn state_record(&self) -> Record {
        Record::empty()
    }

    /// Save the parameters of the agent in the given directory.
    #[allow(unused_variables)]
    fn save_params(&self, path: &Path) -> Result<()> {
        Ok(())
    }

    /// Load the parameters of the agent from the given directory.
    ///
    /// Returns `false` if nothing was found to load.
    #[allow(unused_variables)]
    fn load_params(&mut self, path: &Path) -> Result<bool> {
        Ok(false)
    }
}
