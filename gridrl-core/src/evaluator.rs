//! Evaluate [`Agent`].
use crate::{record::Record, Agent, Env};
use anyhow::Result;
mod default_evaluator;
pub use default_evaluator::DefaultEvaluator;

/// Evaluate [`Agent`].
pub trait Evaluator<E: Env> {
    /// Evaluate [`Agent`].
    ///
    /// The caller of this method needs to handle the internal state of `agent`,
    /// like training/evaluation mode.
    fn evaluate<A: Agent<E>>(&mut self, agent: &mut A) -> Result<Record>;
}

/// An evaluator doing nothing, for training runs without evaluation.
#[derive(Default)]
pub struct NullEvaluator;

impl<E: Env> Evaluator<E> for NullEvaluator {
    fn evaluate<A: Agent<E>>(&mut self, _agent: &mut A) -> Result<Record> {
        Ok(Record::empty())
    }
}
