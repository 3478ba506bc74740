//! Policy iteration.
use crate::planning::{action_values, check_gamma, lookahead};
use anyhow::Result;
use gridrl_core::{Action, Agent, AgentKind, EpsilonGreedy, Env, Mdp, Policy};
use log::{debug, info, warn};
use rand::{rngs::SmallRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`PolicyIteration`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PolicyIterationConfig {
    /// Discount factor.
    pub gamma: f64,

    /// Policy evaluation stops when no value changes by `theta` or more in a sweep.
    pub theta: f64,

    /// Upper bound on the number of evaluation/improvement rounds.
    pub max_iterations: usize,

    /// Seed of the initial policy.
    pub seed: u64,
}

impl Default for PolicyIterationConfig {
    fn default() -> Self {
        Self {
            gamma: 0.9,
            theta: 1e-6,
            max_iterations: 1000,
            seed: 42,
        }
    }
}

impl PolicyIterationConfig {
    /// Sets the discount factor.
    pub fn gamma(mut self, v: f64) -> Self {
        self.gamma = v;
        self
    }

    /// Sets the threshold of policy evaluation.
    pub fn theta(mut self, v: f64) -> Self {
        self.theta = v;
        self
    }

    /// Sets the seed of the initial policy.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Constructs [`PolicyIterationConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`PolicyIterationConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Policy iteration planner.
///
/// Starts from a random policy and alternates
/// * evaluation: in-place sweeps applying the Bellman equation of the current
///   policy until no value changes by `theta` or more;
/// * improvement: every state switches to its greedy action.
///
/// until an improvement step changes nothing. A state only switches when the greedy
/// action beats its current action by more than `theta`, so that values equal up to
/// the evaluation error do not make the policy oscillate.
pub struct PolicyIteration<M: Mdp> {
    model: M,
    config: PolicyIterationConfig,
    states: Vec<M::State>,
    values: HashMap<M::State, f64>,
    policy: HashMap<M::State, Option<Action>>,
    iterations: usize,
    train: bool,
}

impl<M: Mdp> PolicyIteration<M> {
    /// Builds the planner and solves `model`.
    pub fn new(model: M, config: PolicyIterationConfig) -> Result<Self> {
        let mut pi = Self::unsolved(model, config)?;
        pi.solve();
        Ok(pi)
    }

    /// Builds the planner with zero values and a random initial policy.
    pub fn unsolved(model: M, config: PolicyIterationConfig) -> Result<Self> {
        check_gamma(config.gamma)?;
        let mut rng = SmallRng::seed_from_u64(config.seed);
        let states = model.states();
        let values = states.iter().map(|s| (s.clone(), 0.0)).collect();
        let policy = states
            .iter()
            .map(|s| {
                let a = match model.is_terminal(s) {
                    true => None,
                    false => Some(EpsilonGreedy::random(&mut rng)),
                };
                (s.clone(), a)
            })
            .collect();
        Ok(Self {
            model,
            config,
            states,
            values,
            policy,
            iterations: 0,
            train: true,
        })
    }

    /// Evaluates the current policy and returns the number of sweeps.
    pub fn evaluate_policy(&mut self) -> usize {
        let gamma = self.config.gamma;
        let mut n_sweeps = 0;
        loop {
            let mut delta = 0f64;
            for s in self.states.iter() {
                let Some(a) = self.policy.get(s).copied().flatten() else {
                    continue;
                };
                let v = lookahead(&self.model, &self.values, gamma, s, a);
                delta = delta.max((v - self.values[s]).abs());
                self.values.insert(s.clone(), v);
            }
            n_sweeps += 1;
            if delta < self.config.theta {
                return n_sweeps;
            }
        }
    }

    /// Makes the policy greedy with respect to the current values.
    ///
    /// Returns `true` if the policy is stable, i.e. no action changed.
    pub fn improve_policy(&mut self) -> bool {
        let mut stable = true;
        for s in self.states.iter() {
            let Some(current) = self.policy.get(s).copied().flatten() else {
                continue;
            };
            let q = action_values(&self.model, &self.values, self.config.gamma, s);
            let best = EpsilonGreedy::greedy(&q);
            if q[best.index()] > q[current.index()] + self.config.theta {
                self.policy.insert(s.clone(), Some(best));
                stable = false;
            }
        }
        stable
    }

    /// Alternates evaluation and improvement until the policy is stable.
    pub fn solve(&mut self) {
        loop {
            let n_sweeps = self.evaluate_policy();
            self.iterations += 1;
            debug!(
                "Policy iteration {}: evaluation took {} sweeps",
                self.iterations, n_sweeps
            );
            if self.improve_policy() {
                break;
            }
            if self.iterations >= self.config.max_iterations {
                warn!("Policy iteration stopped after {} iterations", self.iterations);
                break;
            }
        }
        info!("Policy iteration converged in {} iterations", self.iterations);
    }

    /// Value of `state` under the current policy.
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

    /// Number of evaluation/improvement rounds performed.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Number of states of the model.
    pub fn n_states(&self) -> usize {
        self.states.len()
    }
}

impl<E, M> Policy<E> for PolicyIteration<M>
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

impl<E, M> Agent<E> for PolicyIteration<M>
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
    use crate::{ValueIteration, ValueIterationConfig};
    use gridrl_grid_env::{GridEnvConfig, GridModel, GridPos};

    #[test]
    fn test_terminates_within_state_count() -> Result<()> {
        let model = GridModel::new(&GridEnvConfig::penalty_grid())?;
        for seed in 0..10 {
            let pi = PolicyIteration::new(model.clone(), PolicyIterationConfig::default().seed(seed))?;
            assert!(pi.iterations() <= pi.n_states());
            assert_eq!(pi.policy(&GridPos::new(3, 3)), None);
        }
        Ok(())
    }

    #[test]
    fn test_values_never_decrease() -> Result<()> {
        let model = GridModel::new(&GridEnvConfig::penalty_grid())?;
        let mut pi = PolicyIteration::unsolved(model.clone(), PolicyIterationConfig::default().seed(3))?;
        let tol = 1e-4;

        pi.evaluate_policy();
        let mut prev = pi.values().clone();
        while !pi.improve_policy() {
            pi.evaluate_policy();
            for (s, v) in pi.values() {
                assert!(*v >= prev[s] - tol, "{:?}: {} < {}", s, v, prev[s]);
            }
            prev = pi.values().clone();
        }
        Ok(())
    }

    #[test]
    fn test_agrees_with_value_iteration() -> Result<()> {
        let model = GridModel::new(&GridEnvConfig::penalty_grid())?;
        let pi = PolicyIteration::new(model.clone(), PolicyIterationConfig::default())?;
        let vi = ValueIteration::new(model, ValueIterationConfig::default())?;
        for (s, v) in vi.values() {
            assert!((pi.value(s) - v).abs() < 1e-4);
        }
        Ok(())
    }
}
