//! Multilayer perceptron.
mod base;
mod config;
use anyhow::Result;
pub use base::Mlp;
use candle_core::Tensor;
use candle_nn::{Linear, Module};
pub use config::MlpConfig;

/// ReLU on every hidden layer, no activation on the output layer.
fn mlp_forward(xs: Tensor, layers: &[Linear]) -> Result<Tensor> {
    let mut xs = xs;
    if let Some((last, hidden)) = layers.split_last() {
        for layer in hidden {
            xs = layer.forward(&xs)?.relu()?;
        }
        xs = last.forward(&xs)?;
    }
    Ok(xs)
}
