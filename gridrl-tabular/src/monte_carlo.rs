//! First-visit Monte Carlo control.
use crate::{planning::check_gamma, QTable};
use anyhow::Result;
use gridrl_core::{
    record::{Record, RecordValue},
    Action, Agent, AgentKind, Configurable, Env, EpsilonGreedy, Policy, Transition,
};
use rand::{rngs::SmallRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fmt::Debug,
    fs::File,
    hash::Hash,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`MonteCarlo`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct MonteCarloConfig {
    /// Discount factor.
    pub gamma: f64,

    /// Exploration schedule.
    pub explorer: EpsilonGreedy,

    /// Random seed of exploration.
    pub seed: u64,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            gamma: 0.9,
            explorer: EpsilonGreedy::fixed(0.1),
            seed: 42,
        }
    }
}

impl MonteCarloConfig {
    /// Sets the discount factor.
    pub fn gamma(mut self, v: f64) -> Self {
        self.gamma = v;
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

    /// Constructs [`MonteCarloConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`MonteCarloConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// First-visit Monte Carlo control with epsilon-greedy exploration.
///
/// Learns once per completed episode. Walking the episode backward, the discounted
/// return `G = gamma * G + r` is accumulated. At the first occurrence of a
/// (state, action) pair in the episode, `G` joins the returns of the pair and
/// `Q(s, a)` becomes the mean of all its returns so far.
pub struct MonteCarlo<S> {
    gamma: f64,
    explorer: EpsilonGreedy,
    q: QTable<S>,
    returns: HashMap<(S, Action), Vec<f64>>,
    visits: HashMap<(S, Action), usize>,
    rng: SmallRng,
    train: bool,
}

impl<S> Configurable for MonteCarlo<S>
where
    S: Clone + Eq + Hash,
{
    type Config = MonteCarloConfig;

    fn build(config: Self::Config) -> Result<Self> {
        check_gamma(config.gamma)?;
        config.explorer.check()?;
        Ok(Self {
            gamma: config.gamma,
            explorer: config.explorer,
            q: QTable::new(),
            returns: HashMap::new(),
            visits: HashMap::new(),
            rng: SmallRng::seed_from_u64(config.seed),
            train: true,
        })
    }
}

impl<S> MonteCarlo<S>
where
    S: Clone + Eq + Hash,
{
    /// Learns from a complete episode.
    pub fn learn(&mut self, episode: &[Transition<S>]) {
        let mut first = HashMap::with_capacity(episode.len());
        for (t, tr) in episode.iter().enumerate() {
            first.entry((tr.state.clone(), tr.action)).or_insert(t);
        }

        let mut g = 0f64;
        for (t, tr) in episode.iter().enumerate().rev() {
            g = self.gamma * g + tr.reward as f64;
            let key = (tr.state.clone(), tr.action);
            if first.get(&key) != Some(&t) {
                continue;
            }
            let returns = self.returns.entry(key.clone()).or_default();
            returns.push(g);
            let mean = returns.iter().sum::<f64>() / returns.len() as f64;
            self.q.set(&tr.state, tr.action, mean);
            *self.visits.entry(key).or_insert(0) += 1;
        }
    }

    /// The table of action values.
    pub fn q_table(&self) -> &QTable<S> {
        &self.q
    }

    /// Returns recorded for `(state, action)`.
    pub fn returns(&self, state: &S, action: Action) -> &[f64] {
        self.returns
            .get(&(state.clone(), action))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Number of episodes in which `(state, action)` occurred.
    pub fn visit_count(&self, state: &S, action: Action) -> usize {
        self.visits
            .get(&(state.clone(), action))
            .copied()
            .unwrap_or(0)
    }

    /// Current exploration rate.
    pub fn epsilon(&self) -> f64 {
        self.explorer.epsilon
    }
}

impl<E, S> Policy<E> for MonteCarlo<S>
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

impl<E, S> Agent<E> for MonteCarlo<S>
where
    E: Env<Obs = S>,
    S: Clone + Eq + Hash + Debug,
{
    fn kind(&self) -> AgentKind {
        AgentKind::Episodic
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

    fn update_episode(&mut self, episode: &[Transition<S>]) -> Result<Option<Record>> {
        self.learn(episode);
        Ok(None)
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
