//! Checkpoint file of [`Dqn`](super::Dqn).
//!
//! A checkpoint is a single safetensors file holding the parameters of the network
//! under their own names, the state of the optimizer (see
//! [`Optimizer::export_state`](crate::opt::Optimizer::export_state)) and the
//! exploration rate under [`EPSILON_KEY`].
use anyhow::Result;
use candle_core::{safetensors, Device, Tensor};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

/// Key of the exploration rate, an `f64` tensor with one element.
pub const EPSILON_KEY: &str = "epsilon";

/// Writes `tensors` to `path`.
///
/// The file is written next to `path` and renamed over it afterwards, so that
/// `path` never holds a partially written checkpoint.
pub(super) fn write(path: &Path, tensors: &HashMap<String, Tensor>) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    safetensors::save(tensors, &tmp)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Reads the tensors at `path`, `None` if there is no such file.
pub(super) fn read(path: &Path, device: &Device) -> Result<Option<HashMap<String, Tensor>>> {
    if !path.is_file() {
        return Ok(None);
    }
    Ok(Some(safetensors::load(path, device)?))
}
