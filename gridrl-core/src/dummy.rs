//! Small environment and agent used in tests.
use crate::{error::GridRlError, Action, Agent, AgentKind, Env, Policy, Step, Transition};
use anyhow::Result;

/// A corridor of `len` cells. `Right` moves toward the goal at the last cell.
pub struct Corridor {
    len: usize,
    pos: usize,
    steps: usize,
    max_steps: usize,
    done: bool,
}

impl Env for Corridor {
    type Config = (usize, usize);
    type Obs = usize;
    type Info = ();

    fn build(config: &Self::Config, _seed: i64) -> Result<Self> {
        Ok(Self {
            len: config.0,
            pos: 0,
            steps: 0,
            max_steps: config.1,
            done: false,
        })
    }

    fn reset(&mut self) -> Result<(usize, ())> {
        self.pos = 0;
        self.steps = 0;
        self.done = false;
        Ok((0, ()))
    }

    fn reset_with_index(&mut self, _ix: usize) -> Result<(usize, ())> {
        self.reset()
    }

    fn step(&mut self, a: Action) -> Result<Step<Self>> {
        if self.done {
            return Err(GridRlError::EpisodeFinished.into());
        }
        self.steps += 1;
        match a {
            Action::Right => self.pos += 1,
            Action::Left => self.pos = self.pos.saturating_sub(1),
            _ => {}
        }
        let is_terminated = self.pos + 1 == self.len;
        let is_truncated = !is_terminated && self.steps >= self.max_steps;
        self.done = is_terminated || is_truncated;
        let reward = if is_terminated { 1.0 } else { -0.1 };
        Ok(Step::new(self.pos, a, reward, is_terminated, is_truncated, ()))
    }
}

/// Always moves right and counts how it was fed.
pub struct Forward {
    pub kind: AgentKind,
    pub n_updates: usize,
    pub episode_lens: Vec<usize>,
    pub n_end_episodes: usize,
    pub train: bool,
}

impl Forward {
    pub fn new(kind: AgentKind) -> Self {
        Self {
            kind,
            n_updates: 0,
            episode_lens: vec![],
            n_end_episodes: 0,
            train: true,
        }
    }
}

impl Policy<Corridor> for Forward {
    fn act(&mut self, _obs: &usize) -> Action {
        Action::Right
    }
}

impl Agent<Corridor> for Forward {
    fn kind(&self) -> AgentKind {
        self.kind
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

    fn update(&mut self, _tr: &Transition<usize>) -> Result<Option<crate::record::Record>> {
        self.n_updates += 1;
        Ok(Some(crate::record::Record::from_scalar("loss", 2.0)))
    }

    fn update_episode(
        &mut self,
        episode: &[Transition<usize>],
    ) -> Result<Option<crate::record::Record>> {
        self.episode_lens.push(episode.len());
        Ok(None)
    }

    fn end_episode(&mut self) {
        self.n_end_episodes += 1;
    }
}
