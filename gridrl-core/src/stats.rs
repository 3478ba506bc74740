//! Episode statistics.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one episode.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct EpisodeStats {
    /// Undiscounted sum of rewards.
    pub reward: f64,

    /// Number of environment steps.
    pub steps: usize,

    /// Whether the episode ended by reaching a goal.
    pub terminated: bool,
}

/// Mean of the last `window` values, or of all values if there are fewer.
///
/// Returns `0.0` for an empty slice.
pub fn window_mean(values: &[f64], window: usize) -> f64 {
    let start = values.len().saturating_sub(window);
    let tail = &values[start..];
    if tail.is_empty() {
        0.0
    } else {
        tail.iter().sum::<f64>() / tail.len() as f64
    }
}

fn mean_std(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let n = values.clone().count();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = values.clone().sum::<f64>() / n as f64;
    let var = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    (mean, var.sqrt())
}

/// Summary of a series of episodes.
///
/// Standard deviations are population standard deviations.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct Summary {
    /// Mean return.
    pub mean_reward: f64,

    /// Standard deviation of the return.
    pub std_reward: f64,

    /// Mean episode length.
    pub mean_steps: f64,

    /// Standard deviation of the episode length.
    pub std_steps: f64,

    /// Fraction of episodes that reached a goal.
    pub success_rate: f64,
}

impl Summary {
    /// Summarizes `history`.
    pub fn from_stats(history: &[EpisodeStats]) -> Self {
        if history.is_empty() {
            return Self::default();
        }
        let (mean_reward, std_reward) = mean_std(history.iter().map(|s| s.reward));
        let (mean_steps, std_steps) = mean_std(history.iter().map(|s| s.steps as f64));
        let n_success = history.iter().filter(|s| s.terminated).count();
        Self {
            mean_reward,
            std_reward,
            mean_steps,
            std_steps,
            success_rate: n_success as f64 / history.len() as f64,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "reward {:>8.3} ± {:<7.3} steps {:>7.2} ± {:<7.2} success {:>5.1}%",
            self.mean_reward,
            self.std_reward,
            self.mean_steps,
            self.std_steps,
            100.0 * self.success_rate
        )
    }
}
