//! Value iteration.
use crate::planning::{action_values, check_gamma};
use anyhow::Result;
use gridrl_core::{Action, Agent, AgentKind, EpsilonGreedy, Env, Mdp, Policy};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`ValueIteration`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ValueIterationConfig {
    /// Discount factor.
    pub gamma: f64,

    /// Sweeps stop when no value changes by `theta` or more.
    pub theta: f64,

    /// Upper bound on the number of sweeps.
    pub max_iterations: usize,
}

impl Default for ValueIterationConfig {
    fn default() -> Self {
        Self {
            gamma: 0.9,
            theta: 1e-6,
            max_iterations: 10_000,
        }
    }
}

impl ValueIterationConfig {
    /// Sets the discount factor.
    pub fn gamma(mut self, v: f64) -> Self {
        self.gamma = v;
        self
    }

    /// Sets the convergence threshold.
    pub fn theta(mut self, v: f64) -> Self {
        self.theta = v;
        self
    }

    /// Sets the upper bound on the number of sweeps.
    pub fn max_iterations(mut self, v: usize) -> Self {
        self.max_iterations = v;
        self
    }

    /// Constructs [`ValueIterationConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ValueIterationConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Value iteration planner.
///
/// Sweeps synchronously over the non-terminal states of the model, replacing
/// every value with its best one-step lookahead, until the largest change of a
/// sweep falls below `theta`. The policy is then extracted greedily, the first
/// action in enumeration order winning ties. Terminal states keep the value `0.0`
/// and have no action.
pub struct ValueIteration<M: Mdp> {
    model: M,
    config: ValueIterationConfig,
    states: Vec<M::State>,
    values: HashMap<M::State, f64>,
    policy: HashMap<M::State, Option<Action>>,
    iterations: usize,
    train: bool,
}

impl<M: Mdp> ValueIteration<M> {
    /// Builds the planner and solves `model`.
    pub fn new(model: M, config: ValueIterationConfig) -> Result<Self> {
        let mut vi = Self::unsolved(model, config)?;
        vi.solve();
        Ok(vi)
    }

    /// Builds the planner with zero values and no policy.
    pub fn unsolved(model: M, config: ValueIterationConfig) -> Result<Self> {
        check_gamma(config.gamma)?;
        let states = model.states();
        let values = states.iter().map(|s| (s.clone(), 0.0)).collect();
        Ok(Self {
            model,
            config,
            states,
            values,
            policy: HashMap::new(),
            iterations: 0,
            train: true,
        })
    }

    /// Performs one synchronous sweep and returns the largest change of a value.
    pub fn sweep(&mut self) -> f64 {
        let mut new_values = self.values.clone();
        let mut delta = 0f64;

        for s in self.states.iter() {
            if self.model.is_terminal(s) {
                continue;
            }
            let q = action_values(&self.model, &self.values, self.config.gamma, s);
            let v = q.into_iter().fold(f64::NEG_INFINITY, f64::max);
            delta = delta.max((v - self.values[s]).abs());
            new_values.insert(s.clone(), v);
        }

        self.values = new_values;
        self.iterations += 1;
        delta
    }

    /// Sweeps until convergence, then extracts the policy.
    pub fn solve(&mut self) {
        loop {
            let delta = self.sweep();
            if delta < self.config.theta {
                break;
            }
            if self.iterations >= self.config.max_iterations {
                warn!(
                    "Value iteration stopped after {} sweeps, delta = {}",
                    self.iterations, delta
                );
                break;
            }
        }
        self.extract_policy();
        info!("Value iteration converged in {} iterations", self.iterations);
    }

    fn extract_policy(&mut self) {
        self.policy = self
            .states
            .iter()
            .map(|s| {
                let a = if self.model.is_terminal(s) {
                    None
                } else {
                    let q = action_values(&self.model, &self.values, self.config.gamma, s);
                    Some(EpsilonGreedy::greedy(&q))
                };
                (s.clone(), a)
            })
            .collect()
    }

    /// Value of `state`.
    pub fn value(&self, state: &M::State) -> f64 {
        self.values.get(state).copied().unwrap_or(0.0)
    }

    /// All values.
    pub fn values(&self) -> &HashMap<M::State, f64> {
        &self.values
    }

    /// Action of the policy in `state`, `None` for terminal or unknown states.
    pub fn policy(&self, state: &M::State) -> Option<Action> {
        self.policy.get(state).copied().flatten()
    }

    /// Number of sweeps performed.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Largest violation of the Bellman optimality equation over the non-terminal states.
    pub fn bellman_residual(&self) -> f64 {
        self.states
            .iter()
            .filter(|s| !self.model.is_terminal(s))
            .map(|s| {
                let q = action_values(&self.model, &self.values, self.config.gamma, s);
                let v = q.into_iter().fold(f64::NEG_INFINITY, f64::max);
                (v - self.value(s)).abs()
            })
            .fold(0.0, f64::max)
    }

    /// The model.
    pub fn model(&self) -> &M {
        &self.model
    }
}

impl<E, M> Policy<E> for ValueIteration<M>
where
    E: Env<Obs = M::State>,
    M: Mdp,
{
    fn act(&mut self, obs: &M::State) -> Action {
        self.policy(obs).unwrap_or_else(|| {
            warn!("No action planned for {:?}", obs);
            Action::Up
        })
    }
}

impl<E, M> Agent<E> for ValueIteration<M>
where
    E: Env<Obs = M::State>,
    M: Mdp,
{
    fn kind(&self) -> AgentKind {
        AgentKind::Planner
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

#[cfg(test)]
mod tests {
    use super::*;
    use gridrl_grid_env::{GridEnvConfig, GridModel, GridPos};

    #[test]
    fn test_converges_to_bellman_fixed_point() -> Result<()> {
        let config = ValueIterationConfig::default();
        let vi = ValueIteration::new(GridModel::new(&GridEnvConfig::penalty_grid())?, config.clone())?;

        assert!(vi.bellman_residual() < config.theta);
        assert_eq!(vi.value(&GridPos::new(3, 3)), 0.0);
        assert_eq!(vi.policy(&GridPos::new(3, 3)), None);
        // the goal is one move away
        assert!((vi.value(&GridPos::new(3, 2)) - 1.0).abs() < 1e-9);
        assert!((vi.value(&GridPos::new(2, 3)) - 1.0).abs() < 1e-9);
        assert_eq!(vi.policy(&GridPos::new(3, 2)), Some(Action::Right));
        assert_eq!(vi.policy(&GridPos::new(2, 3)), Some(Action::Down));
        Ok(())
    }

    #[test]
    fn test_sweeps_from_zero_are_reproducible() -> Result<()> {
        let model = GridModel::new(&GridEnvConfig::penalty_grid())?;
        let a = ValueIteration::new(model.clone(), ValueIterationConfig::default())?;
        let b = ValueIteration::new(model, ValueIterationConfig::default())?;
        assert_eq!(a.iterations(), b.iterations());
        for (s, v) in a.values() {
            assert_eq!(*v, b.value(s));
        }
        Ok(())
    }

    #[test]
    fn test_invalid_gamma() -> Result<()> {
        let model = GridModel::new(&GridEnvConfig::penalty_grid())?;
        assert!(ValueIteration::new(model, ValueIterationConfig::default().gamma(1.0)).is_err());
        Ok(())
    }
}
