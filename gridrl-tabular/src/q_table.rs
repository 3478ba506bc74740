//! Table of action values.
use gridrl_core::{Action, EpsilonGreedy};
use std::{collections::HashMap, hash::Hash};

/// Action values of the states seen so far.
///
/// A state that was never written has the value `0.0` for every action.
#[derive(Debug, Clone)]
pub struct QTable<S> {
    table: HashMap<S, [f64; Action::COUNT]>,
}

impl<S> Default for QTable<S> {
    fn default() -> Self {
        Self {
            table: HashMap::new(),
        }
    }
}

impl<S: Eq + Hash + Clone> QTable<S> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Action values of `state`, zeros if it was never written.
    pub fn get(&self, state: &S) -> [f64; Action::COUNT] {
        self.table
            .get(state)
            .copied()
            .unwrap_or([0.0; Action::COUNT])
    }

    /// Mutable action values of `state`, inserting zeros if it was never written.
    pub fn get_or_default(&mut self, state: &S) -> &mut [f64; Action::COUNT] {
        self.table
            .entry(state.clone())
            .or_insert([0.0; Action::COUNT])
    }

    /// Value of `action` in `state`.
    pub fn value(&self, state: &S, action: Action) -> f64 {
        self.get(state)[action.index()]
    }

    /// Sets the value of `action` in `state`.
    pub fn set(&mut self, state: &S, action: Action, v: f64) {
        self.get_or_default(state)[action.index()] = v;
    }

    /// Largest action value of `state`.
    pub fn max(&self, state: &S) -> f64 {
        self.get(state)
            .into_iter()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// First action with the largest value in `state`.
    pub fn greedy(&self, state: &S) -> Action {
        EpsilonGreedy::greedy(&self.get(state))
    }

    /// Number of written states.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if no state was written.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Iterates over the written states.
    pub fn iter(&self) -> impl Iterator<Item = (&S, &[f64; Action::COUNT])> {
        self.table.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unseen_state_is_zero() {
        let mut q = QTable::<(usize, usize)>::new();
        assert_eq!(q.get(&(2, 3)), [0.0; 4]);
        assert_eq!(q.max(&(2, 3)), 0.0);
        assert_eq!(q.greedy(&(2, 3)), Action::Up);
        assert!(q.is_empty());

        assert_eq!(*q.get_or_default(&(2, 3)), [0.0; 4]);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_set_and_greedy() {
        let mut q = QTable::new();
        q.set(&"s", Action::Left, 0.5);
        q.set(&"s", Action::Right, 0.5);
        assert_eq!(q.value(&"s", Action::Left), 0.5);
        assert_eq!(q.greedy(&"s"), Action::Left);
        assert_eq!(q.max(&"s"), 0.5);
    }
}
