use crate::{
    model::SubModel1,
    opt::{Optimizer, OptimizerConfig},
};
use anyhow::{anyhow, Result};
use candle_core::{DType, Device, Tensor, Var};
use candle_nn::{VarBuilder, VarMap};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Default)]
/// Configuration of [`DqnModel`].
pub struct DqnModelConfig<Q> {
    pub(super) q_config: Q,
    pub(super) opt_config: OptimizerConfig,
}

impl<Q> DqnModelConfig<Q>
where
    Q: for<'de> Deserialize<'de> + Serialize,
{
    /// Sets configurations for action-value function.
    pub fn q_config(mut self, v: Q) -> Self {
        self.q_config = v;
        self
    }

    /// Sets optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Constructs [`DqnModelConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`DqnModelConfig`] to as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Variables of `varmap` sorted by name.
fn named_vars(varmap: &VarMap) -> Result<Vec<(String, Var)>> {
    let data = varmap
        .data()
        .lock()
        .map_err(|_| anyhow!("variables of the model are poisoned"))?;
    let mut vars: Vec<(String, Var)> = data.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    vars.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(vars)
}

/// Overwrites every variable with values drawn uniformly from
/// `[-1/sqrt(fan_in), 1/sqrt(fan_in)]`.
///
/// A bias `x.bias` takes the fan-in of the weight `x.weight` of the same layer.
fn init_vars(vars: &[(String, Var)], seed: u64) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let fan_in = |name: &str, var: &Var| -> usize {
        let weight = name
            .strip_suffix("bias")
            .map(|prefix| format!("{}weight", prefix))
            .and_then(|w| vars.iter().find(|(n, _)| *n == w));
        match weight {
            Some((_, w)) => w.dims().last().copied().unwrap_or(1),
            None => var.dims().last().copied().unwrap_or(1),
        }
    };

    for (name, var) in vars.iter() {
        let bound = 1.0 / (fan_in(name, var).max(1) as f32).sqrt();
        let values: Vec<f32> = (0..var.elem_count())
            .map(|_| rng.gen_range(-bound..bound))
            .collect();
        var.set(&Tensor::from_vec(values, var.dims().to_vec(), var.device())?)?;
    }
    Ok(())
}

/// Action-value network together with its optimizer.
///
/// The network is the only one of the agent: bootstrap targets are computed
/// with the same parameters that are being trained.
pub struct DqnModel<Q>
where
    Q: SubModel1<Input = Tensor, Output = Tensor>,
{
    device: Device,

    // Variables sorted by name
    vars: Vec<(String, Var)>,

    // Action-value function
    q: Q,

    opt: Optimizer,
}

impl<Q> DqnModel<Q>
where
    Q: SubModel1<Input = Tensor, Output = Tensor>,
{
    /// Constructs [`DqnModel`] with parameters initialized from `seed`.
    pub fn build(config: DqnModelConfig<Q::Config>, device: Device, seed: u64) -> Result<Self> {
        let varmap = VarMap::new();
        let q = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
            Q::build(vb, config.q_config)?
        };
        let vars = named_vars(&varmap)?;
        init_vars(&vars, seed)?;
        let opt = config.opt_config.build(vars.clone())?;

        Ok(Self {
            device,
            vars,
            q,
            opt,
        })
    }

    /// Outputs the action-value given observation(s).
    pub fn forward(&self, obs: &Tensor) -> Result<Tensor> {
        self.q.forward(obs)
    }

    /// Applies an optimization step minimizing `loss`.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        self.opt.backward_step(loss)
    }

    /// The device of the parameters.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Parameters sorted by name.
    pub fn vars(&self) -> &[(String, Var)] {
        &self.vars
    }

    /// The optimizer.
    pub fn optimizer(&self) -> &Optimizer {
        &self.opt
    }

    /// The optimizer.
    pub fn optimizer_mut(&mut self) -> &mut Optimizer {
        &mut self.opt
    }

    /// The action-value network.
    pub fn q(&self) -> &Q {
        &self.q
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mlp::{Mlp, MlpConfig};

    fn build(seed: u64) -> Result<DqnModel<Mlp>> {
        let config = DqnModelConfig::default().q_config(MlpConfig::new(2, vec![8], 4));
        DqnModel::build(config, Device::Cpu, seed)
    }

    fn flat(model: &DqnModel<Mlp>) -> Result<Vec<f32>> {
        let mut out = vec![];
        for (_, var) in model.vars() {
            out.extend(var.as_tensor().flatten_all()?.to_vec1::<f32>()?);
        }
        Ok(out)
    }

    #[test]
    fn test_seeded_init() -> Result<()> {
        let names: Vec<&str> = vec!["mlp.ln0.bias", "mlp.ln0.weight", "mlp.ln1.bias", "mlp.ln1.weight"];
        let model = build(3)?;
        assert_eq!(
            model.vars().iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(),
            names
        );
        assert_eq!(flat(&model)?, flat(&build(3)?)?);
        assert_ne!(flat(&model)?, flat(&build(4)?)?);

        // Biases of the output layer are bounded by 1/sqrt(8)
        let bias = model.vars()[2].1.as_tensor().to_vec1::<f32>()?;
        assert!(bias.iter().all(|b| b.abs() <= 1.0 / 8f32.sqrt()));
        Ok(())
    }

    #[test]
    fn test_backward_step_reduces_loss() -> Result<()> {
        let mut model = build(0)?;
        let xs = Tensor::new(&[[1f32, 0.5]], &Device::Cpu)?;
        let target = Tensor::new(&[[1f32, -1.0, 0.5, 2.0]], &Device::Cpu)?;

        let loss0 = candle_nn::loss::mse(&model.forward(&xs)?, &target)?.to_scalar::<f32>()?;
        for _ in 0..50 {
            let loss = candle_nn::loss::mse(&model.forward(&xs)?, &target)?;
            model.backward_step(&loss)?;
        }
        let loss1 = candle_nn::loss::mse(&model.forward(&xs)?, &target)?.to_scalar::<f32>()?;
        assert!(loss1 < loss0);
        assert_eq!(model.optimizer().n_steps(), 50);
        Ok(())
    }
}
