use anyhow::Result;
use gridrl_core::error::GridRlError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Mlp`](super::Mlp).
pub struct MlpConfig {
    pub(super) in_dim: usize,
    pub(super) units: Vec<usize>,
    pub(super) out_dim: usize,
}

impl Default for MlpConfig {
    /// Four input features, two hidden layers of 64 units and one output per action.
    fn default() -> Self {
        Self::new(4, vec![64, 64], 4)
    }
}

impl MlpConfig {
    /// Creates configuration of MLP.
    ///
    /// * `units` - Numbers of units of the hidden layers. May be empty.
    pub fn new(in_dim: usize, units: Vec<usize>, out_dim: usize) -> Self {
        Self {
            in_dim,
            units,
            out_dim,
        }
    }

    /// Dimension of the input.
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    /// Dimension of the output.
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    /// `(in, out)` dimensions of each linear layer.
    pub(super) fn layer_dims(&self) -> Vec<(usize, usize)> {
        let dims: Vec<usize> = std::iter::once(self.in_dim)
            .chain(self.units.iter().copied())
            .chain(std::iter::once(self.out_dim))
            .collect();
        dims.windows(2).map(|w| (w[0], w[1])).collect()
    }

    /// Checks that no layer is empty.
    pub fn check(&self) -> Result<()> {
        if self.layer_dims().iter().any(|&(i, o)| i == 0 || o == 0) {
            return Err(GridRlError::InvalidConfig(format!(
                "layer dimensions must be positive: {:?}",
                self
            ))
            .into());
        }
        Ok(())
    }
}
