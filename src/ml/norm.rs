// ============================================================
// Layer 5 — Batch Normalization over the feature axis
// ============================================================
// Normalises every channel of the last axis using statistics
// gathered over all other axes (batch, step, vertex).
//
// The run mode and the momentum are supplied per call because
// the training loop decays the momentum over global steps.
// Running statistics are module state (RunningState) and are
// therefore saved with every checkpoint record.
//
//   Training:  y = γ·(x − μ_batch)/√(σ²_batch + ε) + β
//              running ← (1 − m)·running + m·batch
//   Inference: y = γ·(x − μ_run)/√(σ²_run + ε) + β

use burn::{
    module::{Param, RunningState},
    prelude::*,
};

/// Whether batch statistics are computed and folded into the
/// running averages (Training) or the running averages are used (Inference).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Training,
    Inference,
}

/// Per-call batch-norm settings threaded through every component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormCtx {
    pub mode:     Mode,
    /// Weight of the current batch statistic in the running average
    pub momentum: f64,
}

impl NormCtx {
    pub fn training(momentum: f64) -> Self {
        Self { mode: Mode::Training, momentum }
    }

    pub fn inference() -> Self {
        Self { mode: Mode::Inference, momentum: 0.0 }
    }
}

#[derive(Config, Debug)]
pub struct FeatureNormConfig {
    pub num_features: usize,
    #[config(default = 1e-3)]
    pub epsilon: f64,
}

impl FeatureNormConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> FeatureNorm<B> {
        FeatureNorm {
            gamma:        Param::from_tensor(Tensor::ones([self.num_features], device)),
            beta:         Param::from_tensor(Tensor::zeros([self.num_features], device)),
            running_mean: RunningState::new(Tensor::zeros([self.num_features], device)),
            running_var:  RunningState::new(Tensor::ones([self.num_features], device)),
            epsilon:      self.epsilon,
        }
    }
}

#[derive(Module, Debug)]
pub struct FeatureNorm<B: Backend> {
    pub gamma:        Param<Tensor<B, 1>>,
    pub beta:         Param<Tensor<B, 1>>,
    pub running_mean: RunningState<Tensor<B, 1>>,
    pub running_var:  RunningState<Tensor<B, 1>>,
    pub epsilon:      f64,
}

impl<B: Backend> FeatureNorm<B> {
    /// x: [..., C] → [..., C]
    pub fn forward<const D: usize>(&self, x: Tensor<B, D>, ctx: NormCtx) -> Tensor<B, D> {
        let dims     = x.dims();
        let channels = dims[D - 1];
        let rows: usize = dims[..D - 1].iter().product();
        let flat: Tensor<B, 2> = x.reshape([rows, channels]);

        let (mean, var) = match ctx.mode {
            Mode::Training  => self.batch_statistics(flat.clone(), ctx.momentum),
            Mode::Inference => (
                self.running_mean.value().reshape([1, channels]),
                self.running_var.value().reshape([1, channels]),
            ),
        };

        let gamma = self.gamma.val().reshape([1, channels]);
        let beta  = self.beta.val().reshape([1, channels]);

        let normed = (flat - mean).div(var.add_scalar(self.epsilon).sqrt());
        (normed * gamma + beta).reshape(dims)
    }

    /// Computes per-channel mean and (biased) variance of `flat`
    /// and folds them into the running averages.
    fn batch_statistics(&self, flat: Tensor<B, 2>, momentum: f64) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let [_, channels] = flat.dims();
        let mean = flat.clone().mean_dim(0);
        let var  = (flat - mean.clone()).powf_scalar(2.0).mean_dim(0);

        let device       = mean.device();
        let running_mean = self.running_mean.value_sync().to_device(&device);
        let running_var  = self.running_var.value_sync().to_device(&device);

        let running_mean = running_mean.mul_scalar(1.0 - momentum)
            .add(mean.clone().detach().reshape([channels]).mul_scalar(momentum));
        let running_var  = running_var.mul_scalar(1.0 - momentum)
            .add(var.clone().detach().reshape([channels]).mul_scalar(momentum));

        self.running_mean.update(running_mean.detach());
        self.running_var.update(running_var.detach());

        (mean, var)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn values(t: Tensor<TestBackend, 2>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_training_output_is_standardised_per_channel() {
        let device = Default::default();
        let norm   = FeatureNormConfig::new(2).with_epsilon(0.0).init::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 1>::from_floats([1.0, 10.0, 3.0, 20.0, 5.0, 30.0], &device)
            .reshape([3, 2]);

        let y = values(norm.forward(x, NormCtx::training(0.5)));
        // channel 0: 1,3,5 → mean 3, std √(8/3)
        let s0 = (8.0f32 / 3.0).sqrt();
        assert_abs_diff_eq!(y[0], -2.0 / s0, epsilon = 1e-5);
        assert_abs_diff_eq!(y[2], 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(y[4], 2.0 / s0, epsilon = 1e-5);
        // channel 1 has the same standardised pattern
        assert_abs_diff_eq!(y[1], y[0], epsilon = 1e-5);
    }

    #[test]
    fn test_running_stats_follow_momentum() {
        let device = Default::default();
        let norm   = FeatureNormConfig::new(1).init::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 1>::from_floats([2.0, 4.0], &device).reshape([2, 1]);

        let _ = norm.forward(x, NormCtx::training(0.25));

        let mean = norm.running_mean.value_sync().into_data().to_vec::<f32>().unwrap();
        let var  = norm.running_var.value_sync().into_data().to_vec::<f32>().unwrap();
        // 0.75·0 + 0.25·3 and 0.75·1 + 0.25·1
        assert_abs_diff_eq!(mean[0], 0.75, epsilon = 1e-6);
        assert_abs_diff_eq!(var[0], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_inference_leaves_running_stats_untouched() {
        let device = Default::default();
        let norm   = FeatureNormConfig::new(3).with_epsilon(0.0).init::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 4>::ones([2, 2, 2, 3], &device).mul_scalar(7.0);

        let y = norm.forward(x, NormCtx::inference());

        // fresh running stats are mean 0, var 1 → identity
        let y: Vec<f32> = y.into_data().to_vec::<f32>().unwrap();
        assert!(y.iter().all(|v| (*v - 7.0).abs() < 1e-6));
        let mean = norm.running_mean.value_sync().into_data().to_vec::<f32>().unwrap();
        assert_eq!(mean, vec![0.0, 0.0, 0.0]);
    }
}
