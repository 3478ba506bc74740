//! DQN agent implemented with candle.
use super::{
    checkpoint::{self, EPSILON_KEY},
    config::DqnConfig,
    model::DqnModel,
};
use crate::{
    mlp::Mlp,
    util::{check_tensor, scalar_f64},
};
use anyhow::Result;
use candle_core::{DType, Tensor};
use candle_nn::loss::mse;
use gridrl_core::{
    error::GridRlError,
    record::{Record, RecordValue},
    Action, Agent, AgentKind, Configurable, Env, EpsilonGreedy, ExperienceBufferBase, Policy,
    ReplayBufferBase, ReplayMemory, Transition,
};
use log::{info, trace, warn};
use rand::{rngs::SmallRng, SeedableRng};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

/// File name of the checkpoint written by [`Agent::save_params`].
pub const CHECKPOINT_FILE: &str = "dqn_agent.safetensors";

/// Epsilon-greedy agent approximating action values with a neural network.
///
/// In direct mode every transition is learned as soon as it arrives
/// ([`Dqn::learn`]). In replay mode transitions are stored ([`Dqn::remember`])
/// and learned from uniform samples of the memory ([`Dqn::replay`]).
///
/// A single-transition step regresses the network output on the state towards
/// the same output with the entry of the taken action replaced by
/// `r` (terminal) or `r + gamma * max_a' Q(s', a')`.
pub struct Dqn {
    qnet: DqnModel<Mlp>,
    memory: Option<ReplayMemory<Transition<Vec<f32>>>>,
    discount_factor: f64,
    explorer: EpsilonGreedy,
    batch_size: usize,
    checkpoint_path: PathBuf,
    train: bool,
    n_opts: usize,
    n_grad_steps: usize,
    rng: SmallRng,
}

impl Configurable for Dqn {
    type Config = DqnConfig;

    /// Constructs DQN agent.
    fn build(config: Self::Config) -> Result<Self> {
        config.check()?;
        let device = config.device.open()?;
        let qnet = DqnModel::build(config.model_config, device, config.seed)?;
        let memory = match &config.replay {
            Some(replay) => Some(ReplayMemory::new(replay)?),
            None => None,
        };

        Ok(Self {
            qnet,
            memory,
            discount_factor: config.discount_factor,
            explorer: config.explorer,
            batch_size: config.batch_size,
            checkpoint_path: config.checkpoint_path,
            train: true,
            n_opts: 0,
            n_grad_steps: 0,
            rng: SmallRng::seed_from_u64(config.seed),
        })
    }
}

impl Dqn {
    fn obs_tensor(&self, obs: &[f32]) -> Result<Tensor> {
        Ok(Tensor::from_slice(obs, (1, obs.len()), self.qnet.device())?)
    }

    /// Action values of `obs` in the order of [`Action::ALL`].
    pub fn q_values(&self, obs: &[f32]) -> Result<Vec<f32>> {
        let q = self.qnet.forward(&self.obs_tensor(obs)?)?.detach();
        Ok(q.squeeze(0)?.to_vec1::<f32>()?)
    }

    /// One gradient step on a single transition. Returns the loss.
    fn grad_step(&mut self, tr: &Transition<Vec<f32>>) -> Result<f32> {
        let target = match tr.done {
            true => tr.reward as f64,
            false => {
                let next = self.q_values(&tr.next_state)?;
                let max = next.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                tr.reward as f64 + self.discount_factor * max as f64
            }
        };

        let pred = self.qnet.forward(&self.obs_tensor(&tr.state)?)?;
        let tgt = {
            let mut tgt = pred.detach().squeeze(0)?.to_vec1::<f32>()?;
            tgt[tr.action.index()] = target as f32;
            Tensor::from_vec(tgt, pred.dims().to_vec(), pred.device())?
        };
        let loss = mse(&pred, &tgt)?;
        self.qnet.backward_step(&loss)?;
        self.n_grad_steps += 1;

        let loss = loss.to_scalar::<f32>()?;
        trace!("loss = {}, target = {}", loss, target);
        Ok(loss)
    }

    /// Learns one transition immediately. Returns the loss.
    pub fn learn(&mut self, tr: &Transition<Vec<f32>>) -> Result<f32> {
        let loss = self.grad_step(tr)?;
        self.n_opts += 1;
        Ok(loss)
    }

    /// Stores a transition in the replay memory, evicting the oldest one when full.
    ///
    /// Does nothing in direct mode.
    pub fn remember(&mut self, tr: Transition<Vec<f32>>) {
        if let Some(memory) = self.memory.as_mut() {
            memory.push(tr);
        }
    }

    /// Learns from `batch_size` distinct transitions sampled from the memory,
    /// one gradient step per transition.
    ///
    /// Returns `None` without learning while the memory holds fewer than
    /// `batch_size` transitions, the mean loss otherwise. In direct mode there is
    /// no memory and nothing is learned.
    pub fn replay(&mut self, batch_size: usize) -> Result<Option<f32>> {
        let batch = match self.memory.as_mut().and_then(|m| m.batch(batch_size)) {
            Some(batch) => batch,
            None => return Ok(None),
        };
        let mut loss = 0f32;
        for tr in batch.iter() {
            loss += self.grad_step(tr)?;
        }
        self.n_opts += 1;
        Ok(Some(loss / batch.len() as f32))
    }

    /// Decays the exploration rate, once per episode.
    pub fn update_epsilon(&mut self) {
        self.explorer.decay();
    }

    /// Current exploration rate.
    pub fn epsilon(&self) -> f64 {
        self.explorer.epsilon
    }

    /// Overrides the exploration rate, clamped to the range of the schedule.
    pub fn set_epsilon(&mut self, v: f64) {
        self.explorer.set_epsilon(v);
    }

    /// Number of [`Dqn::learn`] calls and of [`Dqn::replay`] calls that learned.
    pub fn n_opts(&self) -> usize {
        self.n_opts
    }

    /// Number of single-transition gradient steps.
    pub fn n_grad_steps(&self) -> usize {
        self.n_grad_steps
    }

    /// Number of stored transitions, `None` in direct mode.
    pub fn memory_len(&self) -> Option<usize> {
        self.memory.as_ref().map(|m| m.len())
    }

    /// The checkpoint location given in the configuration.
    pub fn checkpoint_path(&self) -> &Path {
        &self.checkpoint_path
    }

    /// Saves a checkpoint at [`Dqn::checkpoint_path`].
    pub fn save(&self) -> Result<()> {
        self.save_checkpoint(&self.checkpoint_path)
    }

    /// Loads the checkpoint at [`Dqn::checkpoint_path`], `false` if there is none.
    pub fn load(&mut self) -> Result<bool> {
        let path = self.checkpoint_path.clone();
        self.load_checkpoint(path)
    }

    /// The network and its optimizer.
    pub fn model(&self) -> &DqnModel<Mlp> {
        &self.qnet
    }

    /// Saves parameters, optimizer state and exploration rate as one file.
    pub fn save_checkpoint(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut tensors = HashMap::new();
        for (name, var) in self.qnet.vars() {
            tensors.insert(name.clone(), var.as_tensor().copy()?);
        }
        self.qnet.optimizer().export_state(&mut tensors)?;
        tensors.insert(
            EPSILON_KEY.to_string(),
            scalar_f64(self.explorer.epsilon, self.qnet.device())?,
        );
        checkpoint::write(path, &tensors)?;
        info!("Save dqn agent to {:?}", path);
        Ok(())
    }

    /// Restores what [`Dqn::save_checkpoint`] saved.
    ///
    /// Returns `false` if there is no checkpoint at `path`. A checkpoint not matching
    /// the network of this agent is an error, and the agent is left untouched.
    pub fn load_checkpoint(&mut self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        let tensors = match checkpoint::read(path, self.qnet.device())? {
            Some(tensors) => tensors,
            None => {
                info!("No checkpoint at {:?}", path);
                return Ok(false);
            }
        };

        for (name, var) in self.qnet.vars() {
            check_tensor(&tensors, name, var.as_tensor())?;
        }
        self.qnet.optimizer().check_state(&tensors)?;
        let epsilon = match tensors.get(EPSILON_KEY) {
            Some(t) if t.dtype() == DType::F64 && t.elem_count() == 1 => {
                t.flatten_all()?.to_vec1::<f64>()?[0]
            }
            _ => {
                return Err(GridRlError::CheckpointMismatch(format!("missing {}", EPSILON_KEY)).into())
            }
        };
        if !self.explorer.admits(epsilon) {
            return Err(GridRlError::CheckpointMismatch(format!(
                "{} = {} outside [{}, {}]",
                EPSILON_KEY, epsilon, self.explorer.epsilon_min, self.explorer.epsilon_start
            ))
            .into());
        }

        for (name, var) in self.qnet.vars() {
            if let Some(t) = tensors.get(name) {
                var.set(t)?;
            }
        }
        self.qnet.optimizer_mut().import_state(&tensors)?;
        self.explorer.epsilon = epsilon;
        info!("Load dqn agent from {:?}", path);
        Ok(true)
    }
}

impl<E> Policy<E> for Dqn
where
    E: Env,
    E::Obs: Into<Vec<f32>>,
{
    /// In evaluation mode, always the greedy action.
    fn act(&mut self, obs: &E::Obs) -> Action {
        if self.train && self.explorer.is_explore(&mut self.rng) {
            return EpsilonGreedy::random(&mut self.rng);
        }
        let obs: Vec<f32> = obs.clone().into();
        match self.q_values(&obs) {
            Ok(q) => EpsilonGreedy::greedy(&q),
            Err(e) => {
                warn!("Failed to evaluate the action values: {}", e);
                EpsilonGreedy::random(&mut self.rng)
            }
        }
    }
}

impl<E> Agent<E> for Dqn
where
    E: Env,
    E::Obs: Into<Vec<f32>>,
{
    fn kind(&self) -> AgentKind {
        match self.memory {
            Some(_) => AgentKind::Replay,
            None => AgentKind::Online,
        }
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

    fn update(&mut self, tr: &Transition<E::Obs>) -> Result<Option<Record>> {
        let tr: Transition<Vec<f32>> = tr.map(|s| s.clone().into());
        let loss = match self.memory {
            None => Some(self.learn(&tr)?),
            Some(_) => {
                self.remember(tr);
                self.replay(self.batch_size)?
            }
        };
        Ok(loss.map(|loss| Record::from_scalar("loss", loss)))
    }

    fn end_episode(&mut self) {
        self.update_epsilon();
    }

    fn state_record(&self) -> Record {
        let mut record = Record::from_slice(&[
            ("epsilon", RecordValue::Scalar(self.explorer.epsilon as f32)),
            ("n_opts", RecordValue::Scalar(self.n_opts as f32)),
        ]);
        if let Some(len) = self.memory_len() {
            record.insert("replay_len", RecordValue::Scalar(len as f32));
        }
        record
    }

    fn save_params(&self, path: &Path) -> Result<()> {
        self.save_checkpoint(path.join(CHECKPOINT_FILE))
    }

    fn load_params(&mut self, path: &Path) -> Result<bool> {
        self.load_checkpoint(path.join(CHECKPOINT_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mlp::MlpConfig;
    use gridrl_core::ReplayMemoryConfig;
    use gridrl_grid_env::{FeatureFilter, Features, GridEnv};
    use tempdir::TempDir;

    type E = GridEnv<FeatureFilter>;

    fn config() -> DqnConfig {
        DqnConfig::default().q_config(MlpConfig::new(4, vec![16], 4))
    }

    fn transition(i: usize, done: bool) -> Transition<Vec<f32>> {
        let s = vec![(i % 4) as f32, (i / 4 % 4) as f32, 3.0, 3.0];
        let s_ = vec![((i + 1) % 4) as f32, (i / 4 % 4) as f32, 3.0, 3.0];
        Transition::new(s, Action::Right, -0.1, s_, done)
    }

    fn params(agent: &Dqn) -> Result<Vec<Vec<f32>>> {
        let mut out = vec![];
        for (_, var) in agent.model().vars() {
            out.push(var.as_tensor().flatten_all()?.to_vec1::<f32>()?);
        }
        Ok(out)
    }

    fn opt_state(agent: &Dqn) -> Result<HashMap<String, Vec<f32>>> {
        let mut tensors = HashMap::new();
        agent.model().optimizer().export_state(&mut tensors)?;
        let mut out = HashMap::new();
        for (k, t) in tensors.into_iter() {
            out.insert(k, t.flatten_all()?.to_dtype(DType::F32)?.to_vec1::<f32>()?);
        }
        Ok(out)
    }

    #[test]
    fn test_replay_waits_for_batch() -> Result<()> {
        let mut agent = Dqn::build(config().batch_size(32))?;
        assert_eq!(Agent::<E>::kind(&agent), AgentKind::Replay);

        for i in 0..31 {
            agent.remember(transition(i, false));
            assert!(agent.replay(32)?.is_none());
        }
        assert_eq!(agent.n_grad_steps(), 0);
        assert_eq!(agent.n_opts(), 0);

        agent.remember(transition(31, true));
        assert!(agent.replay(32)?.is_some());
        assert_eq!(agent.n_opts(), 1);
        assert_eq!(agent.n_grad_steps(), 32);

        agent.remember(transition(32, false));
        assert!(agent.replay(32)?.is_some());
        assert_eq!(agent.n_opts(), 2);
        assert_eq!(agent.n_grad_steps(), 64);
        assert_eq!(agent.memory_len(), Some(33));
        Ok(())
    }

    #[test]
    fn test_update_dispatch() -> Result<()> {
        let tr = Transition::new(
            Features([0.0, 0.0, 3.0, 3.0]),
            Action::Down,
            -0.1,
            Features([1.0, 0.0, 3.0, 3.0]),
            false,
        );

        let mut direct = Dqn::build(config().direct())?;
        assert_eq!(Agent::<E>::kind(&direct), AgentKind::Online);
        assert!(Agent::<E>::update(&mut direct, &tr)?.is_some());
        assert_eq!(direct.n_grad_steps(), 1);

        // without a memory, storing is ignored and replay never learns
        direct.remember(transition(0, false));
        assert_eq!(direct.memory_len(), None);
        assert!(direct.replay(1)?.is_none());
        assert_eq!(direct.n_grad_steps(), 1);
        assert_eq!(direct.n_opts(), 1);

        let mut replay = Dqn::build(
            config()
                .batch_size(2)
                .replay(ReplayMemoryConfig::default().capacity(4)),
        )?;
        assert!(Agent::<E>::update(&mut replay, &tr)?.is_none());
        let record = Agent::<E>::update(&mut replay, &tr)?.unwrap();
        assert!(record.get_scalar("loss")? >= 0.0);
        assert_eq!(replay.n_grad_steps(), 2);
        Ok(())
    }

    #[test]
    fn test_learn_moves_toward_target() -> Result<()> {
        let mut agent = Dqn::build(config().direct())?;
        let tr = Transition::new(
            vec![1.0, 2.0, 3.0, 3.0],
            Action::Left,
            1.0,
            vec![1.0, 1.0, 3.0, 3.0],
            true,
        );

        for _ in 0..300 {
            agent.learn(&tr)?;
        }
        let q = agent.q_values(&tr.state)?[Action::Left.index()];
        assert!((q - 1.0).abs() < 0.1);
        assert_eq!(agent.n_opts(), 300);
        assert_eq!(agent.model().optimizer().n_steps(), 300);
        Ok(())
    }

    #[test]
    fn test_greedy_is_deterministic() -> Result<()> {
        let mut agent = Dqn::build(config().explorer(EpsilonGreedy::new(1.0, 0.0, 0.995)))?;
        agent.set_epsilon(0.0);
        let obs = Features([2.0, 1.0, 3.0, 3.0]);
        let a = Policy::<E>::act(&mut agent, &obs);
        for _ in 0..20 {
            assert_eq!(Policy::<E>::act(&mut agent, &obs), a);
        }
        assert_eq!(a, EpsilonGreedy::greedy(&agent.q_values(&obs.0)?));

        // evaluation mode ignores the exploration rate
        agent.set_epsilon(1.0);
        Agent::<E>::eval(&mut agent);
        for _ in 0..20 {
            assert_eq!(Policy::<E>::act(&mut agent, &obs), a);
        }
        Ok(())
    }

    #[test]
    fn test_epsilon_decay() -> Result<()> {
        let mut agent = Dqn::build(config())?;
        assert_eq!(agent.epsilon(), 1.0);
        agent.update_epsilon();
        assert!((agent.epsilon() - 0.995).abs() < 1e-12);
        for _ in 0..2000 {
            Agent::<E>::end_episode(&mut agent);
        }
        assert_eq!(agent.epsilon(), 0.01);
        Ok(())
    }

    #[test]
    fn test_checkpoint_roundtrip() -> Result<()> {
        let dir = TempDir::new("dqn_checkpoint")?;
        let path = dir.path().join("models").join("dqn_agent.safetensors");

        let mut agent = Dqn::build(config().direct())?;
        for i in 0..10 {
            agent.learn(&transition(i, i == 9))?;
        }
        agent.set_epsilon(0.37);
        agent.save_checkpoint(&path)?;
        assert!(path.is_file());

        let mut fresh = Dqn::build(config().direct().seed(7))?;
        assert_ne!(params(&agent)?, params(&fresh)?);
        assert!(fresh.load_checkpoint(&path)?);

        assert_eq!(params(&agent)?, params(&fresh)?);
        assert_eq!(opt_state(&agent)?, opt_state(&fresh)?);
        assert_eq!(fresh.model().optimizer().n_steps(), 10);
        assert_eq!(fresh.epsilon(), 0.37);
        Ok(())
    }

    #[test]
    fn test_missing_checkpoint() -> Result<()> {
        let dir = TempDir::new("dqn_checkpoint")?;
        let mut agent = Dqn::build(config())?;
        let before = params(&agent)?;
        assert!(!agent.load_checkpoint(dir.path().join("none.safetensors"))?);
        assert!(!Agent::<E>::load_params(&mut agent, dir.path())?);
        assert_eq!(params(&agent)?, before);
        assert_eq!(agent.epsilon(), 1.0);
        Ok(())
    }

    #[test]
    fn test_mismatched_checkpoint() -> Result<()> {
        let dir = TempDir::new("dqn_checkpoint")?;
        let small = Dqn::build(config().q_config(MlpConfig::new(4, vec![8], 4)))?;
        Agent::<E>::save_params(&small, dir.path())?;

        let mut agent = Dqn::build(config())?;
        agent.set_epsilon(0.5);
        let before = params(&agent)?;
        let err = Agent::<E>::load_params(&mut agent, dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GridRlError>(),
            Some(GridRlError::CheckpointMismatch(_))
        ));
        assert_eq!(params(&agent)?, before);
        assert_eq!(agent.epsilon(), 0.5);
        assert_eq!(agent.model().optimizer().n_steps(), 0);
        Ok(())
    }

    #[test]
    fn test_save_load_at_configured_path() -> Result<()> {
        let dir = TempDir::new("dqn_checkpoint")?;
        let path = dir.path().join("m").join("dqn.safetensors");

        let mut fresh = Dqn::build(config().seed(7).checkpoint_path(&path))?;
        assert!(!fresh.load()?);

        let mut agent = Dqn::build(config().direct().checkpoint_path(&path))?;
        agent.learn(&transition(0, false))?;
        agent.set_epsilon(0.25);
        agent.save()?;
        assert!(path.is_file());

        assert!(fresh.load()?);
        assert_eq!(params(&agent)?, params(&fresh)?);
        assert_eq!(fresh.epsilon(), 0.25);
        Ok(())
    }

    #[test]
    fn test_checkpoint_epsilon_outside_schedule() -> Result<()> {
        let dir = TempDir::new("dqn_checkpoint")?;
        let path = dir.path().join("dqn.safetensors");
        let mut greedy = Dqn::build(config().explorer(EpsilonGreedy::new(1.0, 0.0, 0.995)))?;
        greedy.set_epsilon(0.001);
        greedy.save_checkpoint(&path)?;

        // the default schedule stops at 0.01
        let mut agent = Dqn::build(config().seed(7))?;
        agent.set_epsilon(0.5);
        let before = params(&agent)?;
        let err = agent.load_checkpoint(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GridRlError>(),
            Some(GridRlError::CheckpointMismatch(_))
        ));
        assert_eq!(params(&agent)?, before);
        assert_eq!(agent.epsilon(), 0.5);
        Ok(())
    }

    #[test]
    fn test_set_epsilon_is_clamped() -> Result<()> {
        let mut agent = Dqn::build(config())?;
        agent.set_epsilon(-0.5);
        assert_eq!(agent.epsilon(), 0.01);
        agent.set_epsilon(3.0);
        assert_eq!(agent.epsilon(), 1.0);
        Ok(())
    }
}
