//! Utilities.
use anyhow::Result;
use candle_core::{Device, Tensor};
use gridrl_core::error::GridRlError;
use std::collections::HashMap;

/// Checks that `tensors[key]` exists and has the dtype and shape of `like`.
pub(crate) fn check_tensor(tensors: &HashMap<String, Tensor>, key: &str, like: &Tensor) -> Result<()> {
    let t = tensors
        .get(key)
        .ok_or_else(|| GridRlError::CheckpointMismatch(format!("missing {}", key)))?;
    if t.dtype() != like.dtype() || t.dims() != like.dims() {
        return Err(GridRlError::CheckpointMismatch(format!(
            "{}: expected {:?} {:?}, found {:?} {:?}",
            key,
            like.dtype(),
            like.dims(),
            t.dtype(),
            t.dims()
        ))
        .into());
    }
    Ok(())
}

/// One-element `i64` tensor.
pub(crate) fn scalar_i64(v: i64, device: &Device) -> Result<Tensor> {
    Ok(Tensor::new(&[v], device)?)
}

/// One-element `f64` tensor.
pub(crate) fn scalar_f64(v: f64, device: &Device) -> Result<Tensor> {
    Ok(Tensor::new(&[v], device)?)
}
