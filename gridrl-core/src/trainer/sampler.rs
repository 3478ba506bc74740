//! Runs episodes of an agent on an environment.
use crate::{
    record::{Record, RecordValue::Scalar},
    stats::EpisodeStats,
    Agent, AgentKind, Env, Transition,
};
use anyhow::Result;
use log::trace;

/// Runs episodes and feeds the experience to the agent.
///
/// How the experience reaches the agent depends on [`Agent::kind`]:
/// online and replay agents get every transition through [`Agent::update`],
/// episodic agents get the whole episode through [`Agent::update_episode`]
/// after it ends, planners and baselines get nothing.
/// [`Agent::end_episode`] is called once at the end of every learning episode.
pub struct Sampler {
    max_steps: Option<usize>,
    env_steps: usize,
}

impl Sampler {
    /// Creates a sampler cutting episodes after `max_steps` steps.
    pub fn new(max_steps: Option<usize>) -> Self {
        Self {
            max_steps,
            env_steps: 0,
        }
    }

    /// Total number of environment steps taken.
    pub fn env_steps(&self) -> usize {
        self.env_steps
    }

    /// Runs one episode.
    ///
    /// The agent learns from it if `learn` is `true`. The returned record holds the
    /// mean of the `loss` values reported by the updates, if any.
    pub fn run_episode<E, A>(
        &mut self,
        env: &mut E,
        agent: &mut A,
        learn: bool,
    ) -> Result<(EpisodeStats, Record)>
    where
        E: Env,
        A: Agent<E>,
    {
        let kind = agent.kind();
        let (mut obs, _) = env.reset()?;
        let mut episode = vec![];
        let mut losses = vec![];
        let mut stats = EpisodeStats {
            reward: 0.0,
            steps: 0,
            terminated: false,
        };

        loop {
            let act = agent.act(&obs);
            let step = env.step(act)?;
            self.env_steps += 1;
            stats.steps += 1;
            stats.reward += step.reward as f64;
            stats.terminated = step.is_terminated;
            trace!("{:?} -> {} -> {:?}, r = {}", obs, act, step.obs, step.reward);

            let is_done = step.is_done() || self.max_steps.is_some_and(|m| stats.steps >= m);
            let tr = Transition::from_step(obs, &step);
            obs = step.obs;

            if learn {
                match kind {
                    AgentKind::Online | AgentKind::Replay => {
                        if let Some(record) = agent.update(&tr)? {
                            losses.extend(record.get_scalar("loss").ok());
                        }
                    }
                    AgentKind::Episodic => episode.push(tr),
                    AgentKind::Planner | AgentKind::Baseline => {}
                }
            }

            if is_done {
                break;
            }
        }

        if learn {
            if kind == AgentKind::Episodic {
                if let Some(record) = agent.update_episode(&episode)? {
                    losses.extend(record.get_scalar("loss").ok());
                }
            }
            agent.end_episode();
        }

        let mut record = Record::empty();
        if !losses.is_empty() {
            let loss = losses.iter().sum::<f32>() / losses.len() as f32;
            record.insert("loss", Scalar(loss));
        }

        Ok((stats, record))
    }
}
