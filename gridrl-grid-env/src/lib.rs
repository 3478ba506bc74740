#![warn(missing_docs)]
//! Grid world environment.
//!
//! [`GridEnv`] implements [`Env`](gridrl_core::Env) on a configurable rectangular grid,
//! [`GridModel`] exposes the known model of a deterministic grid to planners.
mod base;
mod config;
mod model;
mod obs;
pub use base::{GridEnv, GridInfo};
pub use config::{GridEnvConfig, Goals, Obstacles};
pub use model::GridModel;
pub use obs::{FeatureFilter, Features, GridPos, ObsFilter, PositionFilter};
