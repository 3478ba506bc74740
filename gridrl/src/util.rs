//! Utilities.
use anyhow::Result;
use gridrl_core::{Action, Agent, Env, Policy};
use gridrl_grid_env::{GridEnv, GridPos, ObsFilter};

/// Cells visited by an agent during one episode.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    /// Positions of the agent, starting with the initial one.
    pub cells: Vec<GridPos>,

    /// Actions taken.
    pub actions: Vec<Action>,

    /// Sum of rewards.
    pub reward: f64,

    /// Whether the episode reached a goal.
    pub terminated: bool,
}

impl Trajectory {
    /// Returns `true` if the agent entered `pos` at any step.
    pub fn visits(&self, pos: &GridPos) -> bool {
        self.cells.contains(pos)
    }
}

/// Runs one episode of `agent` on `env` without learning, for at most `max_steps` steps.
pub fn trajectory<F, A>(env: &mut GridEnv<F>, agent: &mut A, max_steps: usize) -> Result<Trajectory>
where
    F: ObsFilter,
    A: Agent<GridEnv<F>>,
{
    let (mut obs, _) = env.reset()?;
    let mut tr = Trajectory {
        cells: vec![env.agent()],
        actions: vec![],
        reward: 0.0,
        terminated: false,
    };

    for _ in 0..max_steps {
        let a = agent.act(&obs);
        let step = env.step(a)?;
        tr.cells.push(env.agent());
        tr.actions.push(step.act);
        tr.reward += step.reward as f64;
        if step.is_done() {
            tr.terminated = step.is_terminated;
            break;
        }
        obs = step.obs;
    }

    Ok(tr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridrl_core::Configurable;
    use gridrl_grid_env::{GridEnvConfig, PositionFilter};
    use gridrl_tabular::{RandomAgent, RandomAgentConfig};

    #[test]
    fn test_trajectory_is_capped() -> Result<()> {
        let config = GridEnvConfig::penalty_grid();
        let mut env = GridEnv::<PositionFilter>::build(&config, 0)?;
        let mut agent = RandomAgent::build(RandomAgentConfig::default())?;

        let tr = trajectory(&mut env, &mut agent, 5)?;
        assert_eq!(tr.cells[0], GridPos::new(0, 0));
        assert!(tr.actions.len() <= 5);
        assert_eq!(tr.cells.len(), tr.actions.len() + 1);
        assert!(!tr.terminated || tr.cells.last() == Some(&GridPos::new(3, 3)));
        Ok(())
    }
}
