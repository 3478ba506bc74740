use super::{mlp_forward, MlpConfig};
use crate::model::SubModel1;
use anyhow::Result;
use candle_core::{Device, Tensor};
use candle_nn::{linear, Linear, VarBuilder};

/// Returns vector of linear modules from [`MlpConfig`].
fn create_linear_layers(prefix: &str, vs: VarBuilder, config: &MlpConfig) -> Result<Vec<Linear>> {
    let vs = vs.pp(prefix);
    let layers = config
        .layer_dims()
        .iter()
        .enumerate()
        .map(|(i, &(in_dim, out_dim))| linear(in_dim, out_dim, vs.pp(format!("ln{}", i))))
        .collect::<candle_core::Result<Vec<_>>>()?;
    Ok(layers)
}

/// Multilayer perceptron with ReLU activation function.
///
/// Parameters are registered as `mlp.ln<i>.weight` and `mlp.ln<i>.bias`.
pub struct Mlp {
    config: MlpConfig,
    device: Device,
    layers: Vec<Linear>,
}

impl Mlp {
    /// The configuration of the network.
    pub fn config(&self) -> &MlpConfig {
        &self.config
    }
}

impl SubModel1 for Mlp {
    type Config = MlpConfig;
    type Input = Tensor;
    type Output = Tensor;

    fn forward(&self, xs: &Self::Input) -> Result<Tensor> {
        let xs = xs.to_device(&self.device)?;
        mlp_forward(xs, &self.layers)
    }

    fn build(vs: VarBuilder, config: Self::Config) -> Result<Self> {
        config.check()?;
        let device = vs.device().clone();
        let layers = create_linear_layers("mlp", vs, &config)?;

        Ok(Self {
            config,
            device,
            layers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;
    use candle_nn::VarMap;

    #[test]
    fn test_forward_shape() -> Result<()> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let mlp = Mlp::build(vb, MlpConfig::new(3, vec![8, 5], 4))?;

        let xs = Tensor::zeros((2, 3), DType::F32, &Device::Cpu)?;
        assert_eq!(mlp.forward(&xs)?.dims(), &[2, 4]);
        assert_eq!(varmap.all_vars().len(), 6);
        Ok(())
    }
}
