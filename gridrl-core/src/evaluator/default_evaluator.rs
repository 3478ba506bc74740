//! Default implementation of the [`Evaluator`] trait.
use super::Evaluator;
use crate::{
    record::{Record, RecordValue::Scalar},
    stats::{EpisodeStats, Summary},
    Agent, Env,
};
use anyhow::Result;

/// Runs a fixed number of episodes without learning.
///
/// Episode `ix` starts with [`Env::reset_with_index`], so the evaluation episodes are
/// the same from one call to the next. Every episode is cut after `max_steps` steps.
///
/// The returned [`Record`] holds the mean `episode_return`, the mean `episode_steps`
/// and `success_rate`, the fraction of episodes ending at a goal.
pub struct DefaultEvaluator<E: Env> {
    n_episodes: usize,
    max_steps: usize,
    env: E,
}

impl<E: Env> Evaluator<E> for DefaultEvaluator<E> {
    fn evaluate<A: Agent<E>>(&mut self, agent: &mut A) -> Result<Record> {
        let summary = Summary::from_stats(&self.run(agent)?);
        Ok(Record::from_slice(&[
            ("episode_return", Scalar(summary.mean_reward as f32)),
            ("episode_steps", Scalar(summary.mean_steps as f32)),
            ("success_rate", Scalar(summary.success_rate as f32)),
        ]))
    }
}

impl<E: Env> DefaultEvaluator<E> {
    /// Constructs a new [`DefaultEvaluator`] running `n_episodes` of at most 100 steps.
    pub fn new(config: &E::Config, seed: i64, n_episodes: usize) -> Result<Self> {
        Ok(Self {
            n_episodes,
            max_steps: 100,
            env: E::build(config, seed)?,
        })
    }

    /// Sets the step cap of evaluation episodes.
    pub fn max_steps(mut self, v: usize) -> Self {
        self.max_steps = v;
        self
    }

    /// Runs the evaluation episodes and returns their statistics.
    pub fn run<A: Agent<E>>(&mut self, agent: &mut A) -> Result<Vec<EpisodeStats>> {
        let mut history = Vec::with_capacity(self.n_episodes);

        for ix in 0..self.n_episodes {
            let (mut obs, _) = self.env.reset_with_index(ix)?;
            let mut stats = EpisodeStats {
                reward: 0.0,
                steps: 0,
                terminated: false,
            };

            while stats.steps < self.max_steps {
                let act = agent.act(&obs);
                let step = self.env.step(act)?;
                stats.reward += step.reward as f64;
                stats.steps += 1;
                stats.terminated = step.is_terminated;
                if step.is_done() {
                    break;
                }
                obs = step.obs;
            }
            history.push(stats);
        }

        Ok(history)
    }
}
