//! Environment step and transitions.
use super::Env;
use crate::Action;

/// Additional information to `Obs` and `Action`.
pub trait Info {}

impl Info for () {}

/// Represents an action, observation and reward tuple `(a_t, o_t+1, r_t)`
/// with some additional information.
///
/// An environment emits a [`Step`] object at every interaction step.
/// Together with the previous observation it makes a [`Transition`].
pub struct Step<E: Env> {
    /// Action.
    pub act: Action,

    /// Observation.
    pub obs: E::Obs,

    /// Reward.
    pub reward: f32,

    /// Flag denoting if the episode is terminated (a goal was reached).
    pub is_terminated: bool,

    /// Flag denoting if the episode is truncated (the step budget was exhausted).
    pub is_truncated: bool,

    /// Information defined by the environment.
    pub info: E::Info,
}

impl<E: Env> Step<E> {
    /// Constructs a [`Step`] object.
    pub fn new(
        obs: E::Obs,
        act: Action,
        reward: f32,
        is_terminated: bool,
        is_truncated: bool,
        info: E::Info,
    ) -> Self {
        Step {
            act,
            obs,
            reward,
            is_terminated,
            is_truncated,
            info,
        }
    }

    #[inline]
    /// Terminated or truncated.
    pub fn is_done(&self) -> bool {
        self.is_terminated || self.is_truncated
    }
}

/// The atomic unit of experience, `(s, a, r, s', done)`.
///
/// `done` marks a terminal `s'`: learners do not bootstrap from it.
/// Truncation by a step budget is not terminal.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<S> {
    /// State in which the action was taken.
    pub state: S,

    /// Action taken.
    pub action: Action,

    /// Reward received.
    pub reward: f32,

    /// State reached.
    pub next_state: S,

    /// Whether `next_state` is terminal.
    pub done: bool,
}

impl<S> Transition<S> {
    /// Constructs a transition.
    pub fn new(state: S, action: Action, reward: f32, next_state: S, done: bool) -> Self {
        Self {
            state,
            action,
            reward,
            next_state,
            done,
        }
    }

    /// Builds the transition leading from `state` through `step`.
    pub fn from_step<E>(state: S, step: &Step<E>) -> Self
    where
        E: Env<Obs = S>,
        S: Clone,
    {
        Self::new(
            state,
            step.act,
            step.reward,
            step.obs.clone(),
            step.is_terminated,
        )
    }

    /// Converts both states of the transition with `f`.
    pub fn map<T>(&self, f: impl Fn(&S) -> T) -> Transition<T> {
        Transition::new(
            f(&self.state),
            self.action,
            self.reward,
            f(&self.next_state),
            self.done,
        )
    }
}
