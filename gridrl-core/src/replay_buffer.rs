//! Bounded FIFO replay memory.
mod base;
mod config;
pub use base::ReplayMemory;
pub use config::ReplayMemoryConfig;
