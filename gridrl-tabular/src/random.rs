//! Uniformly random baseline.
use anyhow::Result;
use gridrl_core::{Action, Agent, AgentKind, Configurable, Env, EpsilonGreedy, Policy};
use rand::{rngs::SmallRng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Configuration of [`RandomAgent`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct RandomAgentConfig {
    /// Random seed.
    pub seed: u64,
}

impl Default for RandomAgentConfig {
    fn default() -> Self {
        Self { seed: 42 }
    }
}

/// Picks a uniformly random action and never learns.
pub struct RandomAgent {
    rng: SmallRng,
    train: bool,
}

impl Configurable for RandomAgent {
    type Config = RandomAgentConfig;

    fn build(config: Self::Config) -> Result<Self> {
        Ok(Self {
            rng: SmallRng::seed_from_u64(config.seed),
            train: true,
        })
    }
}

impl<E: Env> Policy<E> for RandomAgent {
    fn act(&mut self, _obs: &E::Obs) -> Action {
        EpsilonGreedy::random(&mut self.rng)
    }
}

impl<E: Env> Agent<E> for RandomAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Baseline
    }

    fn train(&mut self) {
        self.train = true;
    }

    fn eval(&mut self) {
        self.train = false;
    }

    fn is_train(&self) -> bool {
        self.train
    }
}
