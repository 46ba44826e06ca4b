// ============================================================
// Layer 5 — Dense Projection (FC)
// ============================================================
// A stack of position-wise linear maps over the last axis.
// Each stage is: Linear → (optional) FeatureNorm → activation.
//
// burn's Linear already broadcasts over every leading axis,
// so a stage on [batch, step, vertex, C] behaves exactly like
// a 1×1 convolution over the (step, vertex) grid.

use burn::{
    module::{Ignored, Param},
    nn::{Initializer, Linear, LinearConfig},
    prelude::*,
    tensor::activation,
};
use serde::{Deserialize, Serialize};

use crate::ml::error::ModelError;
use crate::ml::norm::{FeatureNorm, FeatureNormConfig, NormCtx};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Identity,
    Relu,
}

impl Activation {
    pub fn apply<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Activation::Identity => x,
            Activation::Relu     => activation::relu(x),
        }
    }
}

#[derive(Config, Debug)]
pub struct FcConfig {
    pub d_input:     usize,
    pub units:       Vec<usize>,
    pub activations: Vec<Activation>,
    #[config(default = true)]
    pub use_bias:    bool,
    #[config(default = true)]
    pub batch_norm:  bool,
}

impl FcConfig {
    /// One stage: `d_input → units` followed by `act`.
    pub fn single(d_input: usize, units: usize, act: Activation) -> Self {
        Self::new(d_input, vec![units], vec![act])
    }

    /// The `[D, d_output]` / `[relu, identity]` pattern used by every
    /// attention output, the embeddings and the model head.
    pub fn two_stage(d_input: usize, d_hidden: usize, d_output: usize) -> Self {
        Self::new(
            d_input,
            vec![d_hidden, d_output],
            vec![Activation::Relu, Activation::Identity],
        )
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.units.len() != self.activations.len() {
            return Err(ModelError::StageMismatch {
                units:       self.units.len(),
                activations: self.activations.len(),
            });
        }
        if self.units.is_empty() {
            return Err(ModelError::EmptyProjection);
        }
        if self.d_input == 0 || self.units.contains(&0) {
            return Err(ModelError::ZeroDimension { name: "dense projection width" });
        }
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Fc<B>, ModelError> {
        self.validate()?;

        let mut d_in   = self.d_input;
        let mut stages = Vec::with_capacity(self.units.len());
        for (&units, &act) in self.units.iter().zip(&self.activations) {
            let mut linear = LinearConfig::new(d_in, units)
                .with_bias(self.use_bias)
                .with_initializer(Initializer::XavierUniform { gain: 1.0 })
                .init(device);
            // Biases start at zero; Xavier covers the weight only.
            linear.bias = linear
                .bias
                .map(|_| Param::from_tensor(Tensor::zeros([units], device)));
            let norm = self
                .batch_norm
                .then(|| FeatureNormConfig::new(units).init(device));
            stages.push(FcStage { linear, norm, activation: Ignored(act) });
            d_in = units;
        }
        Ok(Fc { stages })
    }
}

#[derive(Module, Debug)]
pub struct FcStage<B: Backend> {
    pub linear:     Linear<B>,
    pub norm:       Option<FeatureNorm<B>>,
    pub activation: Ignored<Activation>,
}

#[derive(Module, Debug)]
pub struct Fc<B: Backend> {
    pub stages: Vec<FcStage<B>>,
}

impl<B: Backend> Fc<B> {
    /// x: [..., d_input] → [..., units.last()]
    pub fn forward<const D: usize>(&self, x: Tensor<B, D>, ctx: NormCtx) -> Tensor<B, D> {
        self.stages.iter().fold(x, |x, stage| {
            let x = stage.linear.forward(x);
            let x = match &stage.norm {
                Some(norm) => norm.forward(x, ctx),
                None       => x,
            };
            stage.activation.0.apply(x)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_mismatched_lists_are_rejected() {
        let cfg = FcConfig::new(4, vec![8, 8], vec![Activation::Relu]);
        let err = cfg.init::<TestBackend>(&Default::default()).unwrap_err();
        assert_eq!(err, ModelError::StageMismatch { units: 2, activations: 1 });
    }

    #[test]
    fn test_empty_projection_is_rejected() {
        let cfg = FcConfig::new(4, vec![], vec![]);
        assert_eq!(cfg.validate(), Err(ModelError::EmptyProjection));
    }

    #[test]
    fn test_single_is_one_stage() {
        let fc = FcConfig::single(3, 5, Activation::Relu)
            .init::<TestBackend>(&Default::default())
            .unwrap();
        assert_eq!(fc.stages.len(), 1);
        assert_eq!(fc.stages[0].linear.weight.dims(), [3, 5]);
    }

    #[test]
    fn test_projects_last_axis_only() {
        let device = Default::default();
        let fc = FcConfig::two_stage(1, 16, 16).init::<TestBackend>(&device).unwrap();
        let x  = Tensor::<TestBackend, 4>::ones([2, 3, 5, 1], &device);

        let y = fc.forward(x, NormCtx::inference());
        assert_eq!(y.dims(), [2, 3, 5, 16]);
    }

    #[test]
    fn test_relu_output_is_non_negative() {
        let device = Default::default();
        let fc = FcConfig::single(4, 6, Activation::Relu)
            .with_batch_norm(false)
            .init::<TestBackend>(&device)
            .unwrap();
        let x = Tensor::<TestBackend, 3>::random([2, 3, 4], burn::tensor::Distribution::Normal(0.0, 1.0), &device);

        let y: Vec<f32> = fc.forward(x, NormCtx::inference()).into_data().to_vec().unwrap();
        assert!(y.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_bias_free_stage_maps_zero_to_zero() {
        let device = Default::default();
        let fc = FcConfig::single(4, 4, Activation::Identity)
            .with_use_bias(false)
            .with_batch_norm(false)
            .init::<TestBackend>(&device)
            .unwrap();
        let y: Vec<f32> = fc
            .forward(Tensor::<TestBackend, 2>::zeros([3, 4], &device), NormCtx::inference())
            .into_data()
            .to_vec()
            .unwrap();
        assert!(y.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_biases_start_at_zero() {
        let device = Default::default();
        let fc = FcConfig::two_stage(3, 4, 2)
            .with_batch_norm(false)
            .init::<TestBackend>(&device)
            .unwrap();

        for stage in &fc.stages {
            let bias: Vec<f32> = stage.linear.bias.as_ref().unwrap().val().into_data().to_vec().unwrap();
            assert!(bias.iter().all(|b| *b == 0.0));
        }
        // so a zero input stays zero through relu and identity stages
        let y: Vec<f32> = fc
            .forward(Tensor::<TestBackend, 2>::zeros([2, 3], &device), NormCtx::inference())
            .into_data()
            .to_vec()
            .unwrap();
        assert!(y.iter().all(|v| *v == 0.0));
    }
}
