//! Grid world environment.
use crate::{model::outcome, GridEnvConfig, GridPos, Goals, ObsFilter, Obstacles, PositionFilter};
use anyhow::Result;
use gridrl_core::{error::GridRlError, Action, Env, EpsilonGreedy, Info, Step};
use log::{debug, trace};
use rand::{rngs::SmallRng, seq::SliceRandom, Rng, SeedableRng};

/// Information given at every step of the interaction with the environment.
#[derive(Debug, Clone, Default)]
pub struct GridInfo {
    /// Steps taken in the current episode.
    pub steps: usize,

    /// Whether the chosen move was replaced by a random one.
    pub slipped: bool,
}

impl Info for GridInfo {}

/// A rectangular grid world.
///
/// The agent moves between cells with the four actions. Episodes end when the agent
/// enters a goal (terminated) or when `max_steps` steps have been taken (truncated).
/// Stepping after the end of an episode fails with [`GridRlError::EpisodeFinished`].
///
/// Observations are produced by the filter `F`: [`PositionFilter`] for tabular agents,
/// [`FeatureFilter`](crate::FeatureFilter) for agents working on numeric features.
pub struct GridEnv<F: ObsFilter = PositionFilter> {
    config: GridEnvConfig,
    filter: F,
    seed: u64,
    rng: SmallRng,
    agent: GridPos,
    goals: Vec<GridPos>,
    obstacles: Vec<GridPos>,
    steps: usize,
    done: bool,
}

impl<F: ObsFilter> GridEnv<F> {
    /// Position of the agent.
    pub fn agent(&self) -> GridPos {
        self.agent
    }

    /// Goals of the current episode.
    pub fn goals(&self) -> &[GridPos] {
        &self.goals
    }

    /// Obstacles at the current step.
    pub fn obstacles(&self) -> &[GridPos] {
        &self.obstacles
    }

    /// The configuration.
    pub fn config(&self) -> &GridEnvConfig {
        &self.config
    }

    /// Returns `true` if the episode is over.
    pub fn is_done(&self) -> bool {
        self.done
    }

    fn cells(&self) -> impl Iterator<Item = GridPos> + '_ {
        (0..self.config.height)
            .flat_map(move |row| (0..self.config.width).map(move |col| GridPos::new(row, col)))
    }

    /// Draws `count` distinct cells outside `forbidden`.
    fn sample_cells(&mut self, count: usize, forbidden: &[GridPos]) -> Vec<GridPos> {
        let free: Vec<GridPos> = self.cells().filter(|p| !forbidden.contains(p)).collect();
        free.choose_multiple(&mut self.rng, count).copied().collect()
    }

    fn new_episode(&mut self) -> (F::Obs, GridInfo) {
        let fixed_obstacles = match &self.config.obstacles {
            Obstacles::Fixed(obstacles) => obstacles.clone(),
            Obstacles::Random { .. } => vec![],
        };
        self.goals = match &self.config.goals {
            Goals::Fixed(goals) => goals.clone(),
            Goals::Random { count } => {
                let mut forbidden = fixed_obstacles.clone();
                forbidden.extend(self.config.initial_state);
                self.sample_cells(*count, &forbidden)
            }
        };
        self.agent = match self.config.initial_state {
            Some(p) => p,
            None => {
                let forbidden = [self.goals.clone(), fixed_obstacles.clone()].concat();
                self.sample_cells(1, &forbidden)[0]
            }
        };

        self.obstacles = match &self.config.obstacles {
            Obstacles::Fixed(_) => fixed_obstacles,
            Obstacles::Random { count } => {
                let mut forbidden = self.goals.clone();
                forbidden.push(self.agent);
                self.sample_cells(*count, &forbidden)
            }
        };

        self.steps = 0;
        self.done = false;
        debug!(
            "New episode: agent {}, goals {:?}, obstacles {:?}",
            self.agent, self.goals, self.obstacles
        );

        (self.filter.filt(self.agent, &self.goals), GridInfo::default())
    }

    /// Moves every obstacle to a random free neighbour or keeps it in place.
    ///
    /// Obstacles move one after the other and never onto the agent, a goal or another obstacle.
    fn move_obstacles(&mut self) {
        let (h, w) = (self.config.height, self.config.width);
        let old = self.obstacles.clone();
        let mut moved = Vec::with_capacity(old.len());
        for (i, &o) in old.iter().enumerate() {
            let mut candidates = [
                GridPos::new((o.row + 1).min(h - 1), o.col),
                GridPos::new(o.row.saturating_sub(1), o.col),
                GridPos::new(o.row, (o.col + 1).min(w - 1)),
                GridPos::new(o.row, o.col.saturating_sub(1)),
                o,
            ];
            candidates.shuffle(&mut self.rng);
            let chosen = candidates
                .iter()
                .find(|c| {
                    **c != self.agent
                        && !self.goals.contains(c)
                        && !moved.contains(*c)
                        && !old[i + 1..].contains(*c)
                })
                .copied()
                .unwrap_or(o);
            moved.push(chosen);
        }
        self.obstacles = moved;
    }
}

impl<F: ObsFilter> Env for GridEnv<F> {
    type Config = GridEnvConfig;
    type Obs = F::Obs;
    type Info = GridInfo;

    fn build(config: &Self::Config, seed: i64) -> Result<Self> {
        config.check()?;
        let seed = seed as u64;
        let mut env = Self {
            config: config.clone(),
            filter: F::default(),
            seed,
            rng: SmallRng::seed_from_u64(seed),
            agent: GridPos::new(0, 0),
            goals: vec![],
            obstacles: vec![],
            steps: 0,
            done: true,
        };
        env.new_episode();
        env.done = true;
        Ok(env)
    }

    fn reset(&mut self) -> Result<(F::Obs, GridInfo)> {
        Ok(self.new_episode())
    }

    /// Starts the episode determined by `ix` and the seed of the environment.
    fn reset_with_index(&mut self, ix: usize) -> Result<(F::Obs, GridInfo)> {
        let seed = self
            .seed
            .wrapping_mul(0x9E37_79B9_7F4A_7C15)
            .wrapping_add(ix as u64);
        self.rng = SmallRng::seed_from_u64(seed);
        Ok(self.new_episode())
    }

    fn step(&mut self, a: Action) -> Result<Step<Self>> {
        if self.done {
            return Err(GridRlError::EpisodeFinished.into());
        }
        self.steps += 1;

        let slipped = self.config.slip_prob > 0.0 && self.rng.gen::<f64>() < self.config.slip_prob;
        let executed = if slipped {
            EpsilonGreedy::random(&mut self.rng)
        } else {
            a
        };

        let o = outcome(&self.config, &self.goals, &self.obstacles, self.agent, executed);
        trace!("{} --{}--> {}, r = {}", self.agent, executed, o.next, o.reward);
        self.agent = o.next;

        if !o.terminated && self.config.obstacles_move && !self.obstacles.is_empty() {
            self.move_obstacles();
        }

        let is_truncated = !o.terminated && self.config.max_steps.is_some_and(|m| self.steps >= m);
        self.done = o.terminated || is_truncated;

        let obs = self.filter.filt(self.agent, &self.goals);
        let info = GridInfo {
            steps: self.steps,
            slipped,
        };
        Ok(Step::new(obs, a, o.reward as f32, o.terminated, is_truncated, info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FeatureFilter, Features};

    type PosEnv = GridEnv<PositionFilter>;

    #[test]
    fn test_reach_goal() -> Result<()> {
        let mut env = PosEnv::build(&GridEnvConfig::penalty_grid(), 0)?;
        let (obs, _) = env.reset()?;
        assert_eq!(obs, GridPos::new(0, 0));

        let mut rewards = vec![];
        for a in [Action::Right, Action::Right, Action::Right, Action::Down, Action::Down] {
            let step = env.step(a)?;
            assert!(!step.is_done());
            rewards.push(step.reward);
        }
        let step = env.step(Action::Down)?;
        assert!(step.is_terminated && !step.is_truncated);
        assert_eq!(step.obs, GridPos::new(3, 3));
        assert_eq!(step.reward, 1.0);
        assert!(rewards.iter().all(|r| *r == 0.0));
        Ok(())
    }

    #[test]
    fn test_step_after_done_fails() -> Result<()> {
        let config = GridEnvConfig::penalty_grid().max_steps(Some(2));
        let mut env = PosEnv::build(&config, 0)?;

        // not started yet
        assert!(env.step(Action::Up).is_err());

        env.reset()?;
        assert!(!env.step(Action::Up)?.is_done());
        let step = env.step(Action::Up)?;
        assert!(step.is_truncated && !step.is_terminated);
        assert_eq!(step.reward, 0.0);

        let err = env.step(Action::Up).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<GridRlError>(),
            Some(GridRlError::EpisodeFinished)
        ));

        env.reset()?;
        assert!(env.step(Action::Up).is_ok());
        Ok(())
    }

    #[test]
    fn test_random_goal_avoids_start() -> Result<()> {
        let mut env = GridEnv::<FeatureFilter>::build(&GridEnvConfig::random_goal(5), 7)?;
        for _ in 0..200 {
            let (Features(f), _) = env.reset()?;
            assert_eq!(&f[..2], &[0.0, 0.0]);
            assert_ne!(&f[2..], &[0.0, 0.0]);
            assert_eq!(env.goals().len(), 1);
        }
        Ok(())
    }

    #[test]
    fn test_random_goal_avoids_fixed_obstacles() -> Result<()> {
        let config = GridEnvConfig::random_goal(2)
            .obstacles(Obstacles::Fixed(vec![GridPos::new(1, 1)]))
            .max_steps(Some(10));
        let mut env = PosEnv::build(&config, 0)?;
        for _ in 0..200 {
            env.reset()?;
            assert_eq!(env.goals().len(), 1);
            assert!(!env.goals().contains(&GridPos::new(1, 1)));
            assert!(!env.goals().contains(&GridPos::new(0, 0)));
        }
        Ok(())
    }

    #[test]
    fn test_reset_with_index_is_deterministic() -> Result<()> {
        let config = GridEnvConfig::random_goal(5);
        let mut env1 = GridEnv::<FeatureFilter>::build(&config, 3)?;
        let mut env2 = GridEnv::<FeatureFilter>::build(&config, 3)?;
        env2.reset()?;
        for ix in 0..10 {
            assert_eq!(env1.reset_with_index(ix)?.0, env2.reset_with_index(ix)?.0);
        }
        Ok(())
    }

    #[test]
    fn test_moving_obstacles_stay_off_agent_and_goals() -> Result<()> {
        let config = GridEnvConfig::default()
            .size(5, 5)
            .goals(Goals::Fixed(vec![GridPos::new(4, 4)]))
            .obstacles(Obstacles::Random { count: 4 })
            .obstacles_move(true)
            .max_steps(Some(500));
        let mut env = PosEnv::build(&config, 11)?;
        env.reset()?;
        let mut rng = SmallRng::seed_from_u64(0);

        for _ in 0..300 {
            let step = env.step(EpsilonGreedy::random(&mut rng))?;
            let obstacles = env.obstacles();
            assert_eq!(obstacles.len(), 4);
            assert!(!obstacles.contains(&env.agent()));
            assert!(!obstacles.iter().any(|o| env.goals().contains(o)));
            let mut distinct = obstacles.to_vec();
            distinct.sort();
            distinct.dedup();
            assert_eq!(distinct.len(), 4);
            if step.is_done() {
                env.reset()?;
            }
        }
        Ok(())
    }

    #[test]
    fn test_blocked_moves() -> Result<()> {
        let config = GridEnvConfig::default()
            .goals(Goals::Fixed(vec![GridPos::new(3, 3)]))
            .initial_state(Some(GridPos::new(0, 0)))
            .obstacles(Obstacles::Fixed(vec![GridPos::new(0, 1)]));
        let mut env = PosEnv::build(&config, 0)?;
        env.reset()?;

        let step = env.step(Action::Right)?;
        assert_eq!((step.obs, step.reward), (GridPos::new(0, 0), -5.0));
        let step = env.step(Action::Left)?;
        assert_eq!((step.obs, step.reward), (GridPos::new(0, 0), -2.0));
        let step = env.step(Action::Down)?;
        assert_eq!((step.obs, step.reward), (GridPos::new(1, 0), -1.0));
        Ok(())
    }
}
