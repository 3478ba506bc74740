//! Known model of a grid with fixed goals and obstacles.
use crate::{GridEnvConfig, GridPos, Goals, Obstacles};
use anyhow::Result;
use gridrl_core::{error::GridRlError, Action, Mdp};

/// Result of one move on the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Outcome {
    pub next: GridPos,
    pub reward: f64,
    pub terminated: bool,
}

/// Applies the reward rule of [`GridEnvConfig`] to a move from `pos`.
pub(crate) fn outcome(
    config: &GridEnvConfig,
    goals: &[GridPos],
    obstacles: &[GridPos],
    pos: GridPos,
    action: Action,
) -> Outcome {
    let (dr, dc) = action.delta();
    let clamp = |v: usize, d: i64, n: usize| (v as i64 + d).clamp(0, n as i64 - 1) as usize;
    let target = GridPos::new(
        clamp(pos.row, dr, config.height),
        clamp(pos.col, dc, config.width),
    );

    if obstacles.contains(&target) {
        Outcome {
            next: pos,
            reward: config.obstacle_penalty,
            terminated: false,
        }
    } else if goals.contains(&target) {
        Outcome {
            next: target,
            reward: config.goal_reward,
            terminated: true,
        }
    } else {
        let reward = match config.cell_rewards.iter().find(|(p, _)| *p == target) {
            Some((_, r)) => *r,
            None if target != pos => config.step_penalty,
            None => config.wall_penalty,
        };
        Outcome {
            next: target,
            reward,
            terminated: false,
        }
    }
}

/// The transition and reward model of a [`GridEnvConfig`].
///
/// Only deterministic grids have such a model: goals and obstacles must be fixed,
/// obstacles must not move and moves must not slip.
#[derive(Debug, Clone)]
pub struct GridModel {
    config: GridEnvConfig,
    goals: Vec<GridPos>,
    obstacles: Vec<GridPos>,
}

impl GridModel {
    /// Builds the model of `config`.
    pub fn new(config: &GridEnvConfig) -> Result<Self> {
        config.check()?;
        let goals = match &config.goals {
            Goals::Fixed(goals) => goals.clone(),
            Goals::Random { .. } => {
                return Err(GridRlError::InvalidConfig("random goals have no fixed model".into()).into())
            }
        };
        let obstacles = match &config.obstacles {
            Obstacles::Fixed(obstacles) if !config.obstacles_move => obstacles.clone(),
            _ => {
                return Err(GridRlError::InvalidConfig(
                    "random or moving obstacles have no fixed model".into(),
                )
                .into())
            }
        };
        if config.slip_prob > 0.0 {
            return Err(GridRlError::InvalidConfig("slipping moves are not deterministic".into()).into());
        }
        Ok(Self {
            config: config.clone(),
            goals,
            obstacles,
        })
    }

    /// The configuration the model was built from.
    pub fn config(&self) -> &GridEnvConfig {
        &self.config
    }
}

impl Mdp for GridModel {
    type State = GridPos;

    /// Every cell but obstacles, row by row.
    fn states(&self) -> Vec<GridPos> {
        (0..self.config.height)
            .flat_map(|row| (0..self.config.width).map(move |col| GridPos::new(row, col)))
            .filter(|p| !self.obstacles.contains(p))
            .collect()
    }

    fn is_terminal(&self, state: &GridPos) -> bool {
        self.goals.contains(state)
    }

    fn transition(&self, state: &GridPos, action: Action) -> (GridPos, f64) {
        let o = outcome(&self.config, &self.goals, &self.obstacles, *state, action);
        (o.next, o.reward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_penalty_grid_model() -> Result<()> {
        let model = GridModel::new(&GridEnvConfig::penalty_grid())?;
        assert_eq!(model.states().len(), 16);
        assert_eq!(model.states()[5], GridPos::new(1, 1));
        assert!(model.is_terminal(&GridPos::new(3, 3)));

        let p = |r, c| GridPos::new(r, c);
        assert_eq!(model.transition(&p(0, 0), Action::Up), (p(0, 0), 0.0));
        assert_eq!(model.transition(&p(0, 1), Action::Down), (p(1, 1), -0.1));
        assert_eq!(model.transition(&p(3, 2), Action::Right), (p(3, 3), 1.0));
        Ok(())
    }

    #[test]
    fn test_reward_rule_order() -> Result<()> {
        let p = |r, c| GridPos::new(r, c);
        let config = GridEnvConfig::default()
            .goals(Goals::Fixed(vec![p(0, 3)]))
            .obstacles(Obstacles::Fixed(vec![p(1, 0)]))
            .cell_reward(p(0, 1), -3.0);
        let model = GridModel::new(&config)?;

        assert_eq!(model.states().len(), 15);
        assert_eq!(model.transition(&p(0, 0), Action::Down), (p(0, 0), -5.0));
        assert_eq!(model.transition(&p(0, 2), Action::Right), (p(0, 3), 10.0));
        assert_eq!(model.transition(&p(0, 0), Action::Right), (p(0, 1), -3.0));
        assert_eq!(model.transition(&p(2, 2), Action::Down), (p(3, 2), -1.0));
        assert_eq!(model.transition(&p(3, 2), Action::Down), (p(3, 2), -2.0));
        Ok(())
    }

    #[test]
    fn test_no_model_for_random_grids() {
        assert!(GridModel::new(&GridEnvConfig::random_goal(5)).is_err());
        assert!(GridModel::new(&GridEnvConfig::penalty_grid().slip_prob(0.2)).is_err());
        assert!(GridModel::new(&GridEnvConfig::penalty_grid().obstacles_move(true)).is_err());
    }
}
