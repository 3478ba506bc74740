//! Configuration of DQN agent.
use super::DqnModelConfig;
use crate::{mlp::MlpConfig, opt::OptimizerConfig, Device};
use anyhow::Result;
use gridrl_core::{error::GridRlError, Action, EpsilonGreedy, ReplayMemoryConfig};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

/// Constructs [`Dqn`](super::Dqn).
///
/// With `replay` set to `None` the agent learns from each transition directly,
/// otherwise from batches sampled from a replay memory.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct DqnConfig {
    pub(super) model_config: DqnModelConfig<MlpConfig>,
    pub(super) discount_factor: f64,
    pub(super) explorer: EpsilonGreedy,
    pub(super) batch_size: usize,
    pub(super) replay: Option<ReplayMemoryConfig>,
    pub(super) checkpoint_path: PathBuf,
    pub(super) seed: u64,
    #[serde(default)]
    pub device: Device,
}

impl Default for DqnConfig {
    fn default() -> Self {
        Self {
            model_config: Default::default(),
            discount_factor: 0.95,
            explorer: EpsilonGreedy::new(1.0, 0.01, 0.995),
            batch_size: 32,
            replay: Some(ReplayMemoryConfig::default()),
            checkpoint_path: PathBuf::from("models/dqn_agent.safetensors"),
            seed: 42,
            device: Device::Cpu,
        }
    }
}

impl DqnConfig {
    /// Sets the configuration of the action-value network.
    pub fn q_config(mut self, v: MlpConfig) -> Self {
        self.model_config = self.model_config.q_config(v);
        self
    }

    /// Sets the optimizer.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.model_config = self.model_config.opt_config(v);
        self
    }

    /// Discount factor.
    pub fn discount_factor(mut self, v: f64) -> Self {
        self.discount_factor = v;
        self
    }

    /// Exploration schedule.
    pub fn explorer(mut self, v: EpsilonGreedy) -> Self {
        self.explorer = v;
        self
    }

    /// Batch size of replay.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Learn from a replay memory with the given configuration.
    pub fn replay(mut self, v: ReplayMemoryConfig) -> Self {
        self.replay = Some(v);
        self
    }

    /// Learn from every transition directly, without a replay memory.
    pub fn direct(mut self) -> Self {
        self.replay = None;
        self
    }

    /// Default location of the checkpoint.
    pub fn checkpoint_path(mut self, v: impl Into<PathBuf>) -> Self {
        self.checkpoint_path = v.into();
        self
    }

    /// Seed of parameter initialization and exploration.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Device.
    pub fn device(mut self, v: Device) -> Self {
        self.device = v;
        self
    }

    /// Checks the parameters.
    pub fn check(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.discount_factor) {
            return Err(GridRlError::InvalidConfig(format!(
                "discount factor must be in [0, 1): {}",
                self.discount_factor
            ))
            .into());
        }
        if self.batch_size == 0 {
            return Err(GridRlError::InvalidConfig("batch size must be positive".into()).into());
        }
        if let Some(replay) = &self.replay {
            if self.batch_size > replay.get_capacity() {
                return Err(GridRlError::InvalidConfig(format!(
                    "batch size {} exceeds replay capacity {}",
                    self.batch_size,
                    replay.get_capacity()
                ))
                .into());
            }
        }
        if self.model_config.q_config.out_dim() != Action::COUNT {
            return Err(GridRlError::InvalidConfig(format!(
                "the network must output {} action values",
                Action::COUNT
            ))
            .into());
        }
        self.explorer.check()?;
        self.model_config.q_config.check()?;
        self.model_config.opt_config.check()
    }

    /// Constructs [`DqnConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`DqnConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_dqn_config() -> Result<()> {
        let config = DqnConfig::default()
            .direct()
            .batch_size(8)
            .opt_config(OptimizerConfig::Sgd { lr: 0.01 });

        let dir = TempDir::new("dqn_config")?;
        let path = dir.path().join("dqn_config.yaml");
        config.save(&path)?;
        let config_ = DqnConfig::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }

    #[test]
    fn test_check() {
        assert!(DqnConfig::default().check().is_ok());
        assert!(DqnConfig::default().discount_factor(1.0).check().is_err());
        assert!(DqnConfig::default()
            .replay(ReplayMemoryConfig::default().capacity(16))
            .check()
            .is_err());
        assert!(DqnConfig::default()
            .replay(ReplayMemoryConfig::default().capacity(16))
            .direct()
            .check()
            .is_ok());
    }
}
