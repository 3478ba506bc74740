//! Train [`Agent`].
mod config;
mod sampler;
use crate::{
    evaluator::Evaluator,
    record::{AggregateRecorder, RecordValue::Scalar},
    stats::{window_mean, EpisodeStats},
    Agent, Env,
};
use anyhow::Result;
pub use config::TrainerConfig;
use log::{info, warn};
pub use sampler::Sampler;
use std::path::{Path, PathBuf};

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Manages the training loop.
///
/// # Training loop
///
/// For each of the `n_episodes` episodes:
///
/// 1. Reset [`Env`].
/// 2. Until the episode is terminated, truncated or reaches `max_steps_per_episode`:
///    the agent acts, the environment steps and the transition is handed to the agent
///    according to its [`AgentKind`](crate::AgentKind) (see [`Sampler`]).
/// 3. Call [`Agent::end_episode`], typically decaying the exploration rate.
/// 4. Store a record with `episode`, `episode_return`, `episode_steps`, the values of
///    [`Agent::state_record`] and the mean `loss` of the episode, if any.
/// 5. Every `log_interval` episodes, log the mean return and steps of the last
///    `log_interval` episodes and flush the recorder.
/// 6. Every `eval_interval` episodes, evaluate the agent in evaluation mode. When the
///    evaluation return is the best so far, the parameters are saved in `(model_dir)/best`.
/// 7. Every `save_interval` episodes, the parameters are saved in `(model_dir)/(episode)`.
///
/// # Interaction of objects
///
/// ```mermaid
/// graph LR
///     A[Agent]-->|Action|B[Env]
///     B -->|"Step&lt;E: Env&gt;"|C[Sampler]
///     C -->|Transition|A
///     C -->|EpisodeStats|D[Trainer]
///     D -->|Record|E[AggregateRecorder]
/// ```
pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    /// Constructs a trainer.
    pub fn build(config: TrainerConfig) -> Self {
        Self { config }
    }

    /// The configuration.
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    fn save_model<E: Env, A: Agent<E>>(agent: &A, path: PathBuf) {
        match agent.save_params(&path) {
            Ok(()) => info!("Saved the model in {:?}.", &path),
            Err(e) => warn!("Failed to save model in {:?}: {}", &path, e),
        }
    }

    fn model_path(&self, sub: impl AsRef<Path>) -> Option<PathBuf> {
        self.config
            .model_dir
            .as_ref()
            .map(|dir| Path::new(dir).join(sub))
    }

    /// Train the agent and return the statistics of every training episode.
    pub fn train<E, A, D>(
        &mut self,
        env: &mut E,
        agent: &mut A,
        recorder: &mut dyn AggregateRecorder,
        evaluator: &mut D,
    ) -> Result<Vec<EpisodeStats>>
    where
        E: Env,
        A: Agent<E>,
        D: Evaluator<E>,
    {
        let mut sampler = Sampler::new(self.config.max_steps_per_episode);
        let mut history = Vec::with_capacity(self.config.n_episodes);
        let mut max_eval_return = f32::MIN;
        agent.train();

        for episode in 1..=self.config.n_episodes {
            let (stats, mut record) = sampler.run_episode(env, agent, true)?;
            history.push(stats);

            record.insert("episode", Scalar(episode as f32));
            record.insert("episode_return", Scalar(stats.reward as f32));
            record.insert("episode_steps", Scalar(stats.steps as f32));
            record.merge_inplace(agent.state_record());

            // Evaluation
            if self.config.eval_interval > 0 && episode % self.config.eval_interval == 0 {
                agent.eval();
                let eval = evaluator.evaluate(agent)?;
                agent.train();
                if let Ok(eval_return) = eval.get_scalar("episode_return") {
                    info!("Evaluation at episode {}: return {:.3}", episode, eval_return);
                    if eval_return > max_eval_return {
                        max_eval_return = eval_return;
                        if let Some(path) = self.model_path("best") {
                            Self::save_model(agent, path);
                        }
                    }
                }
                for (k, v) in eval.into_iter_in_record() {
                    record.insert(format!("eval_{}", k), v);
                }
            }

            // Save the current model
            if self.config.save_interval > 0 && episode % self.config.save_interval == 0 {
                if let Some(path) = self.model_path(episode.to_string()) {
                    Self::save_model(agent, path);
                }
            }

            recorder.store(record);

            if self.config.log_interval > 0 && episode % self.config.log_interval == 0 {
                let n = self.config.log_interval;
                let rewards: Vec<f64> = history.iter().map(|s| s.reward).collect();
                let steps: Vec<f64> = history.iter().map(|s| s.steps as f64).collect();
                info!(
                    "Episode {}: mean return {:.2}, mean steps {:.1}",
                    episode,
                    window_mean(&rewards, n),
                    window_mean(&steps, n)
                );
                recorder.flush(episode as _);
            }
        }

        Ok(history)
    }

    /// Runs the configured number of episodes without any update.
    ///
    /// Used for agents that do not learn from experience, like planners.
    pub fn evaluate_only<E, A>(
        &self,
        env: &mut E,
        agent: &mut A,
        n_episodes: usize,
    ) -> Result<Vec<EpisodeStats>>
    where
        E: Env,
        A: Agent<E>,
    {
        let mut sampler = Sampler::new(self.config.max_steps_per_episode);
        let mut history = Vec::with_capacity(n_episodes);
        for _ in 0..n_episodes {
            let (stats, _) = sampler.run_episode(env, agent, false)?;
            history.push(stats);
        }
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dummy::{Corridor, Forward},
        record::BufferedRecorder,
        Action, AgentKind, DefaultEvaluator,
    };

    fn corridor() -> Corridor {
        Corridor::build(&(5, 50), 0).unwrap()
    }

    #[test]
    fn test_online_updates_every_step() -> Result<()> {
        let mut env = corridor();
        let mut agent = Forward::new(AgentKind::Online);
        let mut recorder = BufferedRecorder::new();
        let mut evaluator = crate::evaluator::NullEvaluator;
        let mut trainer = Trainer::build(TrainerConfig::default().n_episodes(10).log_interval(5));

        let history = trainer.train(&mut env, &mut agent, &mut recorder, &mut evaluator)?;

        assert_eq!(history.len(), 10);
        assert!(history.iter().all(|s| s.steps == 4 && s.terminated));
        assert_eq!(agent.n_updates, 40);
        assert_eq!(agent.n_end_episodes, 10);
        assert!(agent.episode_lens.is_empty());
        // one aggregated record per flush
        assert_eq!(recorder.len(), 2);
        assert_eq!(recorder.scalars("loss_mean"), vec![2.0, 2.0]);
        assert_eq!(recorder.scalars("step"), vec![5.0, 10.0]);
        Ok(())
    }

    #[test]
    fn test_episodic_gets_whole_episode() -> Result<()> {
        let mut env = corridor();
        let mut agent = Forward::new(AgentKind::Episodic);
        let mut recorder = BufferedRecorder::new();
        let mut evaluator = crate::evaluator::NullEvaluator;
        let mut trainer = Trainer::build(TrainerConfig::default().n_episodes(3));

        trainer.train(&mut env, &mut agent, &mut recorder, &mut evaluator)?;

        assert_eq!(agent.n_updates, 0);
        assert_eq!(agent.episode_lens, vec![4, 4, 4]);
        assert_eq!(agent.n_end_episodes, 3);
        Ok(())
    }

    #[test]
    fn test_planner_is_never_updated() -> Result<()> {
        let mut env = corridor();
        let mut agent = Forward::new(AgentKind::Planner);
        let trainer = Trainer::build(TrainerConfig::default());

        let history = trainer.evaluate_only(&mut env, &mut agent, 7)?;

        assert_eq!(history.len(), 7);
        assert_eq!(agent.n_updates, 0);
        assert_eq!(agent.n_end_episodes, 0);
        Ok(())
    }

    #[test]
    fn test_step_cap_cuts_episodes() -> Result<()> {
        let mut env = Corridor::build(&(100, 1000), 0)?;
        let mut agent = Forward::new(AgentKind::Online);
        let trainer = Trainer::build(TrainerConfig::default().max_steps_per_episode(10));

        let history = trainer.evaluate_only(&mut env, &mut agent, 2)?;

        assert!(history.iter().all(|s| s.steps == 10 && !s.terminated));
        Ok(())
    }

    #[test]
    fn test_evaluation_restores_train_mode() -> Result<()> {
        let mut env = corridor();
        let mut agent = Forward::new(AgentKind::Online);
        let mut recorder = BufferedRecorder::new();
        let mut evaluator = DefaultEvaluator::<Corridor>::new(&(5, 50), 0, 3)?;
        let mut trainer = Trainer::build(
            TrainerConfig::default()
                .n_episodes(4)
                .eval_interval(2)
                .log_interval(4),
        );

        trainer.train(&mut env, &mut agent, &mut recorder, &mut evaluator)?;

        assert!(agent.is_train());
        let record = recorder.iter().last().unwrap();
        assert_eq!(record.get_scalar("eval_success_rate_mean")?, 1.0);
        assert_eq!(record.get_scalar("eval_episode_steps_mean")?, 4.0);
        Ok(())
    }

    #[test]
    fn test_step_after_done_fails() -> Result<()> {
        let mut env = Corridor::build(&(2, 10), 0)?;
        env.reset()?;
        assert!(env.step(Action::Right)?.is_terminated);
        let err = env.step(Action::Right).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<crate::error::GridRlError>(),
            Some(crate::error::GridRlError::EpisodeFinished)
        ));
        Ok(())
    }
}
