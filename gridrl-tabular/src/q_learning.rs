//! Q-learning.
use crate::{planning::check_gamma, QTable};
use anyhow::Result;
use gridrl_core::{
    error::GridRlError,
    record::{Record, RecordValue},
    Action, Agent, AgentKind, Configurable, Env, EpsilonGreedy, Policy, Transition,
};
use rand::{rngs::SmallRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{
    fmt::Debug,
    fs::File,
    hash::Hash,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`QLearning`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct QLearningConfig {
    /// Discount factor.
    pub gamma: f64,

    /// Learning rate.
    pub alpha: f64,

    /// Exploration schedule.
    pub explorer: EpsilonGreedy,

    /// Random seed of exploration.
    pub seed: u64,
}

impl Default for QLearningConfig {
    fn default() -> Self {
        Self {
            gamma: 0.9,
            alpha: 0.1,
            explorer: EpsilonGreedy::fixed(0.1),
            seed: 42,
        }
    }
}

impl QLearningConfig {
    /// Sets the discount factor.
    pub fn gamma(mut self, v: f64) -> Self {
        self.gamma = v;
        self
    }

    /// Sets the learning rate.
    pub fn alpha(mut self, v: f64) -> Self {
        self.alpha = v;
        self
    }

    /// Sets the exploration schedule.
    pub fn explorer(mut self, v: EpsilonGreedy) -> Self {
        self.explorer = v;
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Checks the parameters.
    pub fn check(&self) -> Result<()> {
        check_gamma(self.gamma)?;
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(
                GridRlError::InvalidConfig(format!("alpha must be in (0, 1]: {}", self.alpha)).into(),
            );
        }
        self.explorer.check()
    }

    /// Constructs [`QLearningConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`QLearningConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// One-step Q-learning with epsilon-greedy exploration.
///
/// After every step, `Q(s, a) += alpha * (target - Q(s, a))` where the target is
/// `r` for a terminal `s'` and `r + gamma * max_a' Q(s', a')` otherwise.
pub struct QLearning<S> {
    gamma: f64,
    alpha: f64,
    explorer: EpsilonGreedy,
    q: QTable<S>,
    rng: SmallRng,
    train: bool,
}

impl<S> Configurable for QLearning<S>
where
    S: Clone + Eq + Hash,
{
    type Config = QLearningConfig;

    fn build(config: Self::Config) -> Result<Self> {
        config.check()?;
        Ok(Self {
            gamma: config.gamma,
            alpha: config.alpha,
            explorer: config.explorer,
            q: QTable::new(),
            rng: SmallRng::seed_from_u64(config.seed),
            train: true,
        })
    }
}

impl<S> QLearning<S>
where
    S: Clone + Eq + Hash,
{
    /// Applies the update of one transition and returns the TD error.
    pub fn learn(&mut self, tr: &Transition<S>) -> f64 {
        let target = match tr.done {
            true => tr.reward as f64,
            false => tr.reward as f64 + self.gamma * self.q.max(&tr.next_state),
        };
        let q = &mut self.q.get_or_default(&tr.state)[tr.action.index()];
        let td = target - *q;
        *q += self.alpha * td;
        td
    }

    /// The table of action values.
    pub fn q_table(&self) -> &QTable<S> {
        &self.q
    }

    /// Current exploration rate.
    pub fn epsilon(&self) -> f64 {
        self.explorer.epsilon
    }

    /// Overrides the exploration rate, clamped to the range of the schedule.
    pub fn set_epsilon(&mut self, v: f64) {
        self.explorer.set_epsilon(v);
    }
}

impl<E, S> Policy<E> for QLearning<S>
where
    E: Env<Obs = S>,
    S: Clone + Eq + Hash + Debug,
{
    fn act(&mut self, obs: &S) -> Action {
        let values = self.q.get(obs);
        match self.train {
            true => self.explorer.select(&values, &mut self.rng),
            false => EpsilonGreedy::greedy(&values),
        }
    }
}

impl<E, S> Agent<E> for QLearning<S>
where
    E: Env<Obs = S>,
    S: Clone + Eq + Hash + Debug,
{
    fn kind(&self) -> AgentKind {
        AgentKind::Online
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

    fn update(&mut self, tr: &Transition<S>) -> Result<Option<Record>> {
        let td = self.learn(tr);
        Ok(Some(Record::from_scalar("loss", (td * td) as f32)))
    }

    fn end_episode(&mut self) {
        self.explorer.decay();
    }

    fn state_record(&self) -> Record {
        Record::from_slice(&[
            ("epsilon", RecordValue::Scalar(self.explorer.epsilon as f32)),
            ("n_states", RecordValue::Scalar(self.q.len() as f32)),
        ])
    }
}
