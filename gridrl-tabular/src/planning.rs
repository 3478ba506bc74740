//! One-step lookahead on a known model.
use gridrl_core::{Action, Mdp};
use std::collections::HashMap;

/// `r + gamma * V(s')` for the move `action` from `state`.
///
/// States missing from `values` count as `0.0`.
pub(crate) fn lookahead<M: Mdp>(
    model: &M,
    values: &HashMap<M::State, f64>,
    gamma: f64,
    state: &M::State,
    action: Action,
) -> f64 {
    let (next, reward) = model.transition(state, action);
    reward + gamma * values.get(&next).copied().unwrap_or(0.0)
}

/// Lookahead values of every action in enumeration order.
pub(crate) fn action_values<M: Mdp>(
    model: &M,
    values: &HashMap<M::State, f64>,
    gamma: f64,
    state: &M::State,
) -> [f64; Action::COUNT] {
    Action::ALL.map(|a| lookahead(model, values, gamma, state, a))
}

/// Checks the discount factor.
pub(crate) fn check_gamma(gamma: f64) -> anyhow::Result<()> {
    if (0.0..1.0).contains(&gamma) {
        Ok(())
    } else {
        Err(gridrl_core::error::GridRlError::InvalidConfig(format!(
            "gamma must be in [0, 1): {}",
            gamma
        ))
        .into())
    }
}
