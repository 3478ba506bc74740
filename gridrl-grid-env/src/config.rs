//! Configuration of [`GridEnv`](crate::GridEnv).
use crate::GridPos;
use anyhow::Result;
use gridrl_core::error::GridRlError;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Goal cells of an episode.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum Goals {
    /// The same goals in every episode.
    Fixed(Vec<GridPos>),

    /// `count` distinct goals drawn at every reset.
    Random {
        /// Number of goals.
        count: usize,
    },
}

/// Obstacle cells of an episode.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum Obstacles {
    /// The same obstacles at the start of every episode.
    Fixed(Vec<GridPos>),

    /// `count` distinct obstacles drawn at every reset, away from the goals and the agent.
    Random {
        /// Number of obstacles.
        count: usize,
    },
}

/// Configuration of [`GridEnv`](crate::GridEnv).
///
/// Rewards of a step are decided in this order:
///
/// 1. the target cell holds an obstacle: `obstacle_penalty`, the agent does not move;
/// 2. the target cell is a goal: `goal_reward`, the episode terminates;
/// 3. the target cell has an entry in `cell_rewards`: that reward;
/// 4. the agent moved: `step_penalty`;
/// 5. the agent bumped into the border: `wall_penalty`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GridEnvConfig {
    /// Number of rows.
    pub height: usize,

    /// Number of columns.
    pub width: usize,

    /// Goal cells.
    pub goals: Goals,

    /// Start cell. Drawn among free cells at every reset if `None`.
    pub initial_state: Option<GridPos>,

    /// Obstacle cells.
    pub obstacles: Obstacles,

    /// Whether obstacles random-walk after every step.
    pub obstacles_move: bool,

    /// Episodes are truncated after this number of steps.
    pub max_steps: Option<usize>,

    /// Reward for reaching a goal.
    pub goal_reward: f64,

    /// Reward for an ordinary move.
    pub step_penalty: f64,

    /// Reward for bumping into the border.
    pub wall_penalty: f64,

    /// Reward for bumping into an obstacle.
    pub obstacle_penalty: f64,

    /// Rewards for entering specific cells.
    pub cell_rewards: Vec<(GridPos, f64)>,

    /// Probability that a uniformly random move replaces the chosen one.
    pub slip_prob: f64,
}

impl Default for GridEnvConfig {
    fn default() -> Self {
        Self {
            height: 4,
            width: 4,
            goals: Goals::Fixed(vec![GridPos::new(0, 0), GridPos::new(3, 3)]),
            initial_state: None,
            obstacles: Obstacles::Fixed(vec![]),
            obstacles_move: false,
            max_steps: Some(40),
            goal_reward: 10.0,
            step_penalty: -1.0,
            wall_penalty: -2.0,
            obstacle_penalty: -5.0,
            cell_rewards: vec![],
            slip_prob: 0.0,
        }
    }
}

impl GridEnvConfig {
    /// 4x4 grid starting at `(0, 0)` with the goal at `(3, 3)` giving `1.0`,
    /// penalty cells `(1, 1)` and `(2, 2)` giving `-0.1` and every other move free.
    pub fn penalty_grid() -> Self {
        Self {
            height: 4,
            width: 4,
            goals: Goals::Fixed(vec![GridPos::new(3, 3)]),
            initial_state: Some(GridPos::new(0, 0)),
            obstacles: Obstacles::Fixed(vec![]),
            obstacles_move: false,
            max_steps: None,
            goal_reward: 1.0,
            step_penalty: 0.0,
            wall_penalty: 0.0,
            obstacle_penalty: 0.0,
            cell_rewards: vec![(GridPos::new(1, 1), -0.1), (GridPos::new(2, 2), -0.1)],
            slip_prob: 0.0,
        }
    }

    /// `size` x `size` grid starting at `(0, 0)` with one goal drawn per episode
    /// giving `10.0`, any other step costing `0.1`.
    pub fn random_goal(size: usize) -> Self {
        Self {
            height: size,
            width: size,
            goals: Goals::Random { count: 1 },
            initial_state: Some(GridPos::new(0, 0)),
            obstacles: Obstacles::Fixed(vec![]),
            obstacles_move: false,
            max_steps: None,
            goal_reward: 10.0,
            step_penalty: -0.1,
            wall_penalty: -0.1,
            obstacle_penalty: -0.1,
            cell_rewards: vec![],
            slip_prob: 0.0,
        }
    }

    /// Sets the size of the grid.
    pub fn size(mut self, height: usize, width: usize) -> Self {
        self.height = height;
        self.width = width;
        self
    }

    /// Sets the goals.
    pub fn goals(mut self, v: Goals) -> Self {
        self.goals = v;
        self
    }

    /// Sets the start cell.
    pub fn initial_state(mut self, v: Option<GridPos>) -> Self {
        self.initial_state = v;
        self
    }

    /// Sets the obstacles.
    pub fn obstacles(mut self, v: Obstacles) -> Self {
        self.obstacles = v;
        self
    }

    /// Sets whether obstacles move.
    pub fn obstacles_move(mut self, v: bool) -> Self {
        self.obstacles_move = v;
        self
    }

    /// Sets the step budget of an episode.
    pub fn max_steps(mut self, v: Option<usize>) -> Self {
        self.max_steps = v;
        self
    }

    /// Sets the goal reward.
    pub fn goal_reward(mut self, v: f64) -> Self {
        self.goal_reward = v;
        self
    }

    /// Sets the reward of an ordinary move.
    pub fn step_penalty(mut self, v: f64) -> Self {
        self.step_penalty = v;
        self
    }

    /// Sets the reward of bumping into the border.
    pub fn wall_penalty(mut self, v: f64) -> Self {
        self.wall_penalty = v;
        self
    }

    /// Sets the reward of bumping into an obstacle.
    pub fn obstacle_penalty(mut self, v: f64) -> Self {
        self.obstacle_penalty = v;
        self
    }

    /// Sets the reward of entering `pos`.
    pub fn cell_reward(mut self, pos: GridPos, reward: f64) -> Self {
        self.cell_rewards.retain(|(p, _)| *p != pos);
        self.cell_rewards.push((pos, reward));
        self
    }

    /// Sets the slip probability.
    pub fn slip_prob(mut self, v: f64) -> Self {
        self.slip_prob = v;
        self
    }

    /// Number of cells.
    pub fn n_cells(&self) -> usize {
        self.height * self.width
    }

    /// Returns `true` if `pos` lies in the grid.
    pub fn contains(&self, pos: &GridPos) -> bool {
        pos.row < self.height && pos.col < self.width
    }

    /// Checks that the configuration describes a playable grid.
    pub fn check(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(GridRlError::InvalidConfig(msg).into()) };

        if self.height == 0 || self.width == 0 {
            return invalid(format!("empty grid {}x{}", self.height, self.width));
        }
        if !(0.0..=1.0).contains(&self.slip_prob) {
            return invalid(format!("slip_prob must be in [0, 1]: {}", self.slip_prob));
        }

        let n_goals = match &self.goals {
            Goals::Fixed(goals) => {
                if goals.is_empty() {
                    return invalid("no goal".into());
                }
                if let Some(p) = goals.iter().find(|p| !self.contains(p)) {
                    return invalid(format!("goal {} outside the grid", p));
                }
                goals.len()
            }
            Goals::Random { count } => *count,
        };
        if n_goals == 0 {
            return invalid("no goal".into());
        }

        let n_obstacles = match &self.obstacles {
            Obstacles::Fixed(obstacles) => {
                if let Some(p) = obstacles.iter().find(|p| !self.contains(p)) {
                    return invalid(format!("obstacle {} outside the grid", p));
                }
                if let Goals::Fixed(goals) = &self.goals {
                    if let Some(p) = obstacles.iter().find(|p| goals.contains(p)) {
                        return invalid(format!("obstacle {} on a goal", p));
                    }
                }
                obstacles.len()
            }
            Obstacles::Random { count } => *count,
        };
        if n_goals + n_obstacles + 1 > self.n_cells() {
            return invalid(format!(
                "{} goals and {} obstacles do not fit in {} cells with the agent",
                n_goals,
                n_obstacles,
                self.n_cells()
            ));
        }

        if let Some(p) = &self.initial_state {
            if !self.contains(p) {
                return invalid(format!("initial state {} outside the grid", p));
            }
            if let Goals::Fixed(goals) = &self.goals {
                if goals.contains(p) {
                    return invalid(format!("initial state {} is a goal", p));
                }
            }
            if let Obstacles::Fixed(obstacles) = &self.obstacles {
                if obstacles.contains(p) {
                    return invalid(format!("initial state {} is an obstacle", p));
                }
            }
        }

        if let Some(p) = self.cell_rewards.iter().find(|(p, _)| !self.contains(p)) {
            return invalid(format!("cell reward at {} outside the grid", p.0));
        }

        Ok(())
    }

    /// Constructs [`GridEnvConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`GridEnvConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_presets_are_valid() {
        assert!(GridEnvConfig::default().check().is_ok());
        assert!(GridEnvConfig::penalty_grid().check().is_ok());
        assert!(GridEnvConfig::random_goal(5).check().is_ok());
    }

    #[test]
    fn test_invalid_configs() {
        let goal_outside = GridEnvConfig::penalty_grid().goals(Goals::Fixed(vec![GridPos::new(4, 0)]));
        assert!(goal_outside.check().is_err());

        let start_on_goal = GridEnvConfig::penalty_grid().initial_state(Some(GridPos::new(3, 3)));
        assert!(start_on_goal.check().is_err());

        let crowded = GridEnvConfig::default()
            .size(2, 2)
            .goals(Goals::Random { count: 1 })
            .obstacles(Obstacles::Random { count: 3 });
        assert!(crowded.check().is_err());

        assert!(GridEnvConfig::default().slip_prob(1.5).check().is_err());
    }

    #[test]
    fn test_serde_config() -> Result<()> {
        let config = GridEnvConfig::penalty_grid()
            .obstacles(Obstacles::Random { count: 2 })
            .obstacles_move(true)
            .max_steps(Some(50));

        let dir = TempDir::new("grid_env_config")?;
        let path = dir.path().join("grid_env_config.yaml");
        config.save(&path)?;
        assert_eq!(config, GridEnvConfig::load(&path)?);
        Ok(())
    }
}
