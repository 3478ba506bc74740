//! Epsilon-greedy exploration shared by the learners.
use crate::{action::first_argmax, error::GridRlError, Action};
use anyhow::Result;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Epsilon-greedy action selection with a multiplicative per-episode decay.
///
/// The exploration rate always lies in `[epsilon_min, epsilon_start]`.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct EpsilonGreedy {
    /// Current exploration rate.
    pub epsilon: f64,

    /// Exploration rate at the start of training.
    pub epsilon_start: f64,

    /// Floor of the exploration rate.
    pub epsilon_min: f64,

    /// Factor applied to the exploration rate by [`EpsilonGreedy::decay`].
    pub epsilon_decay: f64,
}

impl Default for EpsilonGreedy {
    fn default() -> Self {
        Self::fixed(0.1)
    }
}

impl EpsilonGreedy {
    /// Constant exploration rate.
    pub fn fixed(epsilon: f64) -> Self {
        Self::new(epsilon, epsilon, 1.0)
    }

    /// Exploration rate starting at `start` and decaying by `decay` per episode down to `min`.
    pub fn new(start: f64, min: f64, decay: f64) -> Self {
        Self {
            epsilon: start,
            epsilon_start: start,
            epsilon_min: min,
            epsilon_decay: decay,
        }
    }

    /// Exploration rate reaching `min` from `start` after `n_episodes` decays.
    pub fn decay_over(start: f64, min: f64, n_episodes: usize) -> Self {
        let decay = if n_episodes == 0 || start <= 0.0 || min <= 0.0 {
            1.0
        } else {
            (min / start).powf(1.0 / n_episodes as f64)
        };
        Self::new(start, min, decay)
    }

    /// Checks the invariants of the schedule.
    pub fn check(&self) -> Result<()> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !in_unit(self.epsilon_start) || !in_unit(self.epsilon_min) {
            return Err(GridRlError::InvalidConfig(format!(
                "epsilon must be in [0, 1]: start={}, min={}",
                self.epsilon_start, self.epsilon_min
            ))
            .into());
        }
        if self.epsilon_min > self.epsilon_start {
            return Err(GridRlError::InvalidConfig(format!(
                "epsilon_min ({}) is larger than epsilon_start ({})",
                self.epsilon_min, self.epsilon_start
            ))
            .into());
        }
        if !(0.0..=1.0).contains(&self.epsilon_decay) || self.epsilon_decay == 0.0 {
            return Err(GridRlError::InvalidConfig(format!(
                "epsilon_decay must be in (0, 1]: {}",
                self.epsilon_decay
            ))
            .into());
        }
        Ok(())
    }

    /// Applies one decay step, `epsilon <- max(epsilon_min, epsilon * epsilon_decay)`.
    pub fn decay(&mut self) {
        self.epsilon = (self.epsilon * self.epsilon_decay).max(self.epsilon_min);
    }

    /// Sets the exploration rate, clamped to `[epsilon_min, epsilon_start]`.
    pub fn set_epsilon(&mut self, v: f64) {
        self.epsilon = v.clamp(self.epsilon_min, self.epsilon_start);
    }

    /// Returns `true` if `v` is a rate this schedule can take.
    pub fn admits(&self, v: f64) -> bool {
        (self.epsilon_min..=self.epsilon_start).contains(&v)
    }

    /// Resets the exploration rate to its start value.
    pub fn reset(&mut self) {
        self.epsilon = self.epsilon_start;
    }

    /// Draws whether the next action is exploratory.
    pub fn is_explore(&self, rng: &mut impl Rng) -> bool {
        rng.gen::<f64>() < self.epsilon
    }

    /// Uniformly random action.
    pub fn random(rng: &mut impl Rng) -> Action {
        Action::ALL[rng.gen_range(0..Action::COUNT)]
    }

    /// Random action with probability epsilon, the first maximizer of `values` otherwise.
    pub fn select<T: PartialOrd + Copy>(&self, values: &[T], rng: &mut impl Rng) -> Action {
        if self.is_explore(rng) {
            Self::random(rng)
        } else {
            Self::greedy(values)
        }
    }

    /// The first action maximizing `values`.
    pub fn greedy<T: PartialOrd + Copy>(values: &[T]) -> Action {
        Action::ALL[first_argmax(values)]
    }

    /// Sets the initial exploration rate.
    pub fn epsilon_start(mut self, v: f64) -> Self {
        self.epsilon_start = v;
        self.epsilon = v;
        self
    }

    /// Sets the floor of the exploration rate.
    pub fn epsilon_min(mut self, v: f64) -> Self {
        self.epsilon_min = v;
        self
    }

    /// Sets the decay factor.
    pub fn epsilon_decay(mut self, v: f64) -> Self {
        self.epsilon_decay = v;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};

    #[test]
    fn test_decay_stays_above_floor() {
        let mut eg = EpsilonGreedy::new(1.0, 0.01, 0.995);
        for _ in 0..5000 {
            eg.decay();
            assert!(eg.epsilon >= eg.epsilon_min);
            assert!(eg.epsilon <= eg.epsilon_start);
        }
        assert_eq!(eg.epsilon, 0.01);
    }

    #[test]
    fn test_decay_over_reaches_floor() {
        let mut eg = EpsilonGreedy::decay_over(1.0, 0.01, 1000);
        for _ in 0..999 {
            eg.decay();
        }
        assert!(eg.epsilon > 0.01);
        eg.decay();
        assert!((eg.epsilon - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_zero_epsilon_is_greedy() {
        let eg = EpsilonGreedy::fixed(0.0);
        let mut rng = SmallRng::seed_from_u64(0);
        let values = [0.5, 2.0, 2.0, -1.0];
        for _ in 0..100 {
            assert_eq!(eg.select(&values, &mut rng), Action::Down);
        }
    }

    #[test]
    fn test_full_epsilon_explores_every_action() {
        let eg = EpsilonGreedy::fixed(1.0);
        let mut rng = SmallRng::seed_from_u64(1);
        let mut seen = [false; Action::COUNT];
        for _ in 0..200 {
            seen[eg.select(&[0.0, 0.0, 0.0, 1.0], &mut rng).index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_set_epsilon_is_clamped() {
        let mut eg = EpsilonGreedy::new(0.8, 0.05, 0.99);
        eg.set_epsilon(0.3);
        assert_eq!(eg.epsilon, 0.3);
        eg.set_epsilon(1.5);
        assert_eq!(eg.epsilon, 0.8);
        eg.set_epsilon(0.0);
        assert_eq!(eg.epsilon, 0.05);
        assert!(eg.admits(0.05) && eg.admits(0.8));
        assert!(!eg.admits(0.9) && !eg.admits(-0.1));
    }

    #[test]
    fn test_check() {
        assert!(EpsilonGreedy::new(1.0, 0.01, 0.995).check().is_ok());
        assert!(EpsilonGreedy::new(0.01, 0.1, 0.995).check().is_err());
        assert!(EpsilonGreedy::new(1.0, 0.01, 0.0).check().is_err());
    }
}
