//! Optimizers.
use crate::util::{check_tensor, scalar_i64};
use anyhow::Result;
use candle_core::{backprop::GradStore, Device, Tensor, Var};
use gridrl_core::error::GridRlError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Key of the step counter in an exported optimizer state.
pub const STEP_KEY: &str = "opt.step";

/// Configuration of optimizer for training neural networks in an RL agent.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum OptimizerConfig {
    /// Adam optimizer.
    Adam {
        /// Learning rate.
        lr: f64,
        #[serde(default = "default_beta1")]
        /// Decay of the first moment.
        beta1: f64,
        #[serde(default = "default_beta2")]
        /// Decay of the second moment.
        beta2: f64,
        #[serde(default = "default_eps")]
        /// Added to the denominator.
        eps: f64,
    },

    /// Plain stochastic gradient descent.
    Sgd {
        /// Learning rate.
        lr: f64,
    },
}

fn default_beta1() -> f64 {
    0.9
}

fn default_beta2() -> f64 {
    0.999
}

fn default_eps() -> f64 {
    1e-7
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::Adam {
            lr: 1e-3,
            beta1: default_beta1(),
            beta2: default_beta2(),
            eps: default_eps(),
        }
    }
}

impl OptimizerConfig {
    /// Constructs the optimizer of the given named variables.
    pub fn build(&self, params: Vec<(String, Var)>) -> Result<Optimizer> {
        self.check()?;
        let moments = match self {
            Self::Adam { .. } => params
                .iter()
                .map(|(_, var)| {
                    let m = Var::zeros(var.dims(), var.dtype(), var.device())?;
                    let v = Var::zeros(var.dims(), var.dtype(), var.device())?;
                    Ok((m, v))
                })
                .collect::<candle_core::Result<Vec<_>>>()?,
            Self::Sgd { .. } => vec![],
        };

        Ok(Optimizer {
            config: self.clone(),
            params,
            moments,
            t: 0,
        })
    }

    /// Override learning rate.
    pub fn learning_rate(self, lr: f64) -> Self {
        match self {
            Self::Adam {
                lr: _,
                beta1,
                beta2,
                eps,
            } => Self::Adam {
                lr,
                beta1,
                beta2,
                eps,
            },
            Self::Sgd { lr: _ } => Self::Sgd { lr },
        }
    }

    /// Checks the hyperparameters.
    pub fn check(&self) -> Result<()> {
        let ok = match self {
            Self::Adam {
                lr,
                beta1,
                beta2,
                eps,
            } => {
                *lr > 0.0
                    && (0.0..1.0).contains(beta1)
                    && (0.0..1.0).contains(beta2)
                    && *eps > 0.0
            }
            Self::Sgd { lr } => *lr > 0.0,
        };
        match ok {
            true => Ok(()),
            false => Err(GridRlError::InvalidConfig(format!("{:?}", self)).into()),
        }
    }
}

/// Optimizer of a fixed list of named variables.
///
/// Unlike the optimizers of `candle_nn`, the internal state can be exported
/// and restored, so that training resumes exactly where a checkpoint left it.
pub struct Optimizer {
    config: OptimizerConfig,
    params: Vec<(String, Var)>,

    // First and second moments of each parameter (Adam only)
    moments: Vec<(Var, Var)>,

    // Number of steps taken
    t: u64,
}

impl Optimizer {
    /// Computes the gradients of `loss` and applies a step.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        let grads = loss.backward()?;
        self.step(&grads)
    }

    /// Applies a step with the given gradients.
    ///
    /// Variables without a gradient are left unchanged.
    pub fn step(&mut self, grads: &GradStore) -> Result<()> {
        self.t += 1;
        match self.config {
            OptimizerConfig::Sgd { lr } => {
                for (_, var) in self.params.iter() {
                    if let Some(g) = grads.get(var.as_tensor()) {
                        var.set(&var.as_tensor().sub(&g.affine(lr, 0.0)?)?)?;
                    }
                }
            }
            OptimizerConfig::Adam {
                lr,
                beta1,
                beta2,
                eps,
            } => {
                let scale_m = 1.0 / (1.0 - beta1.powf(self.t as f64));
                let scale_v = 1.0 / (1.0 - beta2.powf(self.t as f64));
                for ((_, var), (m, v)) in self.params.iter().zip(self.moments.iter()) {
                    let g = match grads.get(var.as_tensor()) {
                        Some(g) => g,
                        None => continue,
                    };
                    let next_m = m
                        .as_tensor()
                        .affine(beta1, 0.0)?
                        .add(&g.affine(1.0 - beta1, 0.0)?)?;
                    let next_v = v
                        .as_tensor()
                        .affine(beta2, 0.0)?
                        .add(&g.sqr()?.affine(1.0 - beta2, 0.0)?)?;
                    let m_hat = next_m.affine(scale_m, 0.0)?;
                    let v_hat = next_v.affine(scale_v, 0.0)?;
                    let delta = m_hat.div(&v_hat.sqrt()?.affine(1.0, eps)?)?.affine(lr, 0.0)?;
                    m.set(&next_m)?;
                    v.set(&next_v)?;
                    var.set(&var.as_tensor().sub(&delta)?)?;
                }
            }
        }
        Ok(())
    }

    /// Number of steps taken so far.
    pub fn n_steps(&self) -> u64 {
        self.t
    }

    /// The configuration of the optimizer.
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    fn moment_keys(name: &str) -> (String, String) {
        (format!("opt.m.{}", name), format!("opt.v.{}", name))
    }

    /// Adds the state of the optimizer to `tensors`.
    ///
    /// The step counter is stored under [`STEP_KEY`], the moments of parameter `p`
    /// under `opt.m.p` and `opt.v.p`.
    pub fn export_state(&self, tensors: &mut HashMap<String, Tensor>) -> Result<()> {
        tensors.insert(STEP_KEY.to_string(), scalar_i64(self.t as i64, &Device::Cpu)?);
        for ((name, _), (m, v)) in self.params.iter().zip(self.moments.iter()) {
            let (key_m, key_v) = Self::moment_keys(name);
            tensors.insert(key_m, m.as_tensor().copy()?);
            tensors.insert(key_v, v.as_tensor().copy()?);
        }
        Ok(())
    }

    /// Checks that `tensors` holds a state this optimizer can import.
    pub fn check_state(&self, tensors: &HashMap<String, Tensor>) -> Result<()> {
        let step = tensors
            .get(STEP_KEY)
            .ok_or_else(|| GridRlError::CheckpointMismatch(format!("missing {}", STEP_KEY)))?;
        if step.dtype() != candle_core::DType::I64 || step.elem_count() != 1 {
            return Err(GridRlError::CheckpointMismatch(format!("malformed {}", STEP_KEY)).into());
        }
        for ((name, _), (m, v)) in self.params.iter().zip(self.moments.iter()) {
            let (key_m, key_v) = Self::moment_keys(name);
            check_tensor(tensors, &key_m, m.as_tensor())?;
            check_tensor(tensors, &key_v, v.as_tensor())?;
        }
        Ok(())
    }

    /// Restores a state checked with [`Optimizer::check_state`].
    pub fn import_state(&mut self, tensors: &HashMap<String, Tensor>) -> Result<()> {
        self.check_state(tensors)?;
        for ((name, _), (m, v)) in self.params.iter().zip(self.moments.iter()) {
            let (key_m, key_v) = Self::moment_keys(name);
            if let (Some(tm), Some(tv)) = (tensors.get(&key_m), tensors.get(&key_v)) {
                m.set(&tm.to_device(m.device())?)?;
                v.set(&tv.to_device(v.device())?)?;
            }
        }
        if let Some(step) = tensors.get(STEP_KEY) {
            let step = step.flatten_all()?.to_vec1::<i64>()?;
            self.t = step.first().copied().unwrap_or_default() as u64;
        }
        Ok(())
    }
}
