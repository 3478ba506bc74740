//! Value-network agent implemented with [candle](https://crates.io/crates/candle-core).
//!
//! [`Dqn`](dqn::Dqn) approximates the action values of a grid world with a multilayer
//! perceptron and learns either from every transition as it arrives or from samples of a
//! bounded replay memory.
pub mod dqn;
pub mod mlp;
pub mod model;
pub mod opt;
mod util;
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq, Default)]
/// Device for using candle.
///
/// This enum is added because [`candle_core::Device`] does not support serialization.
pub enum Device {
    /// The main CPU device.
    #[default]
    Cpu,

    /// The GPU device with the given ordinal.
    Cuda(usize),
}

impl Device {
    /// Opens the candle device.
    ///
    /// Fails if the device is not available on this machine.
    pub fn open(self) -> Result<candle_core::Device> {
        match self {
            Self::Cpu => Ok(candle_core::Device::Cpu),
            Self::Cuda(n) => Ok(candle_core::Device::new_cuda(n)?),
        }
    }
}
