// ============================================================
// Layer 5 — Spatial / Temporal / Transform Attention
// ============================================================
// All three mechanisms share one layout: the D-wide feature axis
// is split into K heads of width d and moved to axis 1, giving
//
//   [batch, head, a, b, d]
//
// where `b` is the attended axis and `a` is carried along.
//
//   Spatial:   a = step,      b = vertex
//   Temporal:  a = vertex,    b = step        (optional causal mask)
//   Transform: a = vertex,    b = history step, query rows = horizon step
//
// Scores are q·kᵀ/√d, softmax over the last axis, then a weighted
// sum of values. Heads are merged back and pass through a
// two-stage output projection.

use burn::{
    prelude::*,
    tensor::{activation::softmax, Bool, TensorData},
};

use crate::ml::error::ModelError;
use crate::ml::fc::{Activation, Fc, FcConfig};
use crate::ml::norm::NormCtx;

/// Score assigned to masked positions before the softmax (−2¹⁵ + 1).
pub const MASK_FILL: f64 = -32_767.0;

/// Attention result together with the softmax weights that produced it.
pub struct AttentionOutput<B: Backend> {
    /// [batch, rows, vertex, D] in the caller's step/vertex layout
    pub context: Tensor<B, 4>,
    /// [batch, head, a, rows, cols]
    pub weights: Tensor<B, 5>,
}

// ─── Head split / merge ───────────────────────────────────────

/// [batch, step, vertex, K·d] → [batch, K, step, vertex, d]
pub fn split_heads<B: Backend>(x: Tensor<B, 4>, num_heads: usize) -> Tensor<B, 5> {
    let [batch, steps, vertices, width] = x.dims();
    x.reshape([batch, steps, vertices, num_heads, width / num_heads])
        .permute([0, 3, 1, 2, 4])
}

/// [batch, K, step, vertex, d] → [batch, step, vertex, K·d]
pub fn merge_heads<B: Backend>(x: Tensor<B, 5>) -> Tensor<B, 4> {
    let [batch, heads, steps, vertices, head_dim] = x.dims();
    x.permute([0, 2, 3, 1, 4])
        .reshape([batch, steps, vertices, heads * head_dim])
}

/// `true` where key step `j` lies after query step `i`.
pub fn causal_mask<B: Backend>(steps: usize, device: &B::Device) -> Tensor<B, 2, Bool> {
    let cells: Vec<bool> = (0..steps)
        .flat_map(|i| (0..steps).map(move |j| j > i))
        .collect();
    Tensor::from_data(TensorData::new(cells, [steps, steps]), device)
}

/// q: [.., rows, d], k/v: [.., cols, d] → (context [.., rows, d], weights [.., rows, cols])
fn scaled_dot_product<B: Backend>(
    query:    Tensor<B, 5>,
    key:      Tensor<B, 5>,
    value:    Tensor<B, 5>,
    head_dim: usize,
    mask:     Option<Tensor<B, 2, Bool>>,
) -> (Tensor<B, 5>, Tensor<B, 5>) {
    let scores = query
        .matmul(key.swap_dims(3, 4))
        .div_scalar((head_dim as f64).sqrt());

    let scores = match mask {
        Some(mask) => {
            let [rows, cols] = mask.dims();
            let dims = scores.dims();
            let mask = mask.reshape([1, 1, 1, rows, cols]).expand(dims);
            scores.mask_fill(mask, MASK_FILL)
        }
        None => scores,
    };

    let weights = softmax(scores, 4);
    (weights.clone().matmul(value), weights)
}

// ─── Config ───────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct AttentionConfig {
    pub num_heads: usize,
    pub head_dim:  usize,
    #[config(default = true)]
    pub batch_norm: bool,
}

impl AttentionConfig {
    pub fn d_model(&self) -> usize {
        self.num_heads * self.head_dim
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.num_heads == 0 {
            return Err(ModelError::ZeroDimension { name: "num_heads" });
        }
        if self.head_dim == 0 {
            return Err(ModelError::ZeroDimension { name: "head_dim" });
        }
        Ok(())
    }

    fn projection<B: Backend>(&self, d_input: usize, device: &B::Device) -> Result<Fc<B>, ModelError> {
        FcConfig::single(d_input, self.d_model(), Activation::Relu)
            .with_batch_norm(self.batch_norm)
            .init(device)
    }

    fn output<B: Backend>(&self, device: &B::Device) -> Result<Fc<B>, ModelError> {
        let d = self.d_model();
        FcConfig::two_stage(d, d, d)
            .with_batch_norm(self.batch_norm)
            .init(device)
    }

    /// Query/key/value read `[X ‖ STE]`, so their input width is 2·D.
    pub fn init_spatial<B: Backend>(&self, device: &B::Device) -> Result<SpatialAttention<B>, ModelError> {
        self.validate()?;
        let d = self.d_model();
        Ok(SpatialAttention {
            query:     self.projection(2 * d, device)?,
            key:       self.projection(2 * d, device)?,
            value:     self.projection(2 * d, device)?,
            output:    self.output(device)?,
            num_heads: self.num_heads,
            head_dim:  self.head_dim,
        })
    }

    pub fn init_temporal<B: Backend>(
        &self,
        causal: bool,
        device: &B::Device,
    ) -> Result<TemporalAttention<B>, ModelError> {
        self.validate()?;
        let d = self.d_model();
        Ok(TemporalAttention {
            query:     self.projection(2 * d, device)?,
            key:       self.projection(2 * d, device)?,
            value:     self.projection(2 * d, device)?,
            output:    self.output(device)?,
            num_heads: self.num_heads,
            head_dim:  self.head_dim,
            causal,
        })
    }

    pub fn init_transform<B: Backend>(&self, device: &B::Device) -> Result<TransformAttention<B>, ModelError> {
        self.validate()?;
        let d = self.d_model();
        Ok(TransformAttention {
            query:     self.projection(d, device)?,
            key:       self.projection(d, device)?,
            value:     self.projection(d, device)?,
            output:    self.output(device)?,
            num_heads: self.num_heads,
            head_dim:  self.head_dim,
        })
    }
}

// ─── Spatial ──────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct SpatialAttention<B: Backend> {
    pub query:     Fc<B>,
    pub key:       Fc<B>,
    pub value:     Fc<B>,
    pub output:    Fc<B>,
    pub num_heads: usize,
    pub head_dim:  usize,
}

impl<B: Backend> SpatialAttention<B> {
    /// x, ste: [batch, step, vertex, D] → [batch, step, vertex, D]
    pub fn forward(&self, x: Tensor<B, 4>, ste: Tensor<B, 4>, ctx: NormCtx) -> Tensor<B, 4> {
        self.forward_with_scores(x, ste, ctx).context
    }

    /// Weights are [batch, head, step, vertex, vertex].
    pub fn forward_with_scores(&self, x: Tensor<B, 4>, ste: Tensor<B, 4>, ctx: NormCtx) -> AttentionOutput<B> {
        let input = Tensor::cat(vec![x, ste], 3);

        let q = split_heads(self.query.forward(input.clone(), ctx), self.num_heads);
        let k = split_heads(self.key.forward(input.clone(), ctx), self.num_heads);
        let v = split_heads(self.value.forward(input, ctx), self.num_heads);

        let (context, weights) = scaled_dot_product(q, k, v, self.head_dim, None);
        let context = self.output.forward(merge_heads(context), ctx);
        AttentionOutput { context, weights }
    }
}

// ─── Temporal ─────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct TemporalAttention<B: Backend> {
    pub query:     Fc<B>,
    pub key:       Fc<B>,
    pub value:     Fc<B>,
    pub output:    Fc<B>,
    pub num_heads: usize,
    pub head_dim:  usize,
    pub causal:    bool,
}

impl<B: Backend> TemporalAttention<B> {
    /// x, ste: [batch, step, vertex, D] → [batch, step, vertex, D]
    pub fn forward(&self, x: Tensor<B, 4>, ste: Tensor<B, 4>, ctx: NormCtx) -> Tensor<B, 4> {
        self.forward_with_scores(x, ste, ctx).context
    }

    /// Weights are [batch, head, vertex, step, step].
    pub fn forward_with_scores(&self, x: Tensor<B, 4>, ste: Tensor<B, 4>, ctx: NormCtx) -> AttentionOutput<B> {
        let steps  = x.dims()[1];
        let device = x.device();
        let input  = Tensor::cat(vec![x, ste], 3);

        // step becomes the attended axis
        let q = split_heads(self.query.forward(input.clone(), ctx), self.num_heads).swap_dims(2, 3);
        let k = split_heads(self.key.forward(input.clone(), ctx), self.num_heads).swap_dims(2, 3);
        let v = split_heads(self.value.forward(input, ctx), self.num_heads).swap_dims(2, 3);

        let mask = self.causal.then(|| causal_mask::<B>(steps, &device));
        let (context, weights) = scaled_dot_product(q, k, v, self.head_dim, mask);

        let context = self.output.forward(merge_heads(context.swap_dims(2, 3)), ctx);
        AttentionOutput { context, weights }
    }
}

// ─── Transform ────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct TransformAttention<B: Backend> {
    pub query:     Fc<B>,
    pub key:       Fc<B>,
    pub value:     Fc<B>,
    pub output:    Fc<B>,
    pub num_heads: usize,
    pub head_dim:  usize,
}

impl<B: Backend> TransformAttention<B> {
    /// x, ste_his: [batch, num_his, vertex, D], ste_pred: [batch, num_pred, vertex, D]
    /// → [batch, num_pred, vertex, D]
    pub fn forward(
        &self,
        x:        Tensor<B, 4>,
        ste_his:  Tensor<B, 4>,
        ste_pred: Tensor<B, 4>,
        ctx:      NormCtx,
    ) -> Tensor<B, 4> {
        self.forward_with_scores(x, ste_his, ste_pred, ctx).context
    }

    /// Weights are [batch, head, vertex, num_pred, num_his].
    pub fn forward_with_scores(
        &self,
        x:        Tensor<B, 4>,
        ste_his:  Tensor<B, 4>,
        ste_pred: Tensor<B, 4>,
        ctx:      NormCtx,
    ) -> AttentionOutput<B> {
        let q = split_heads(self.query.forward(ste_pred, ctx), self.num_heads).swap_dims(2, 3);
        let k = split_heads(self.key.forward(ste_his, ctx), self.num_heads).swap_dims(2, 3);
        let v = split_heads(self.value.forward(x, ctx), self.num_heads).swap_dims(2, 3);

        let (context, weights) = scaled_dot_product(q, k, v, self.head_dim, None);

        let context = self.output.forward(merge_heads(context.swap_dims(2, 3)), ctx);
        AttentionOutput { context, weights }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::testing::{assert_all_close, normal, values, TestBackend};
    use approx::assert_abs_diff_eq;
    use burn::tensor::Int;
    use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

    fn config(heads: usize, head_dim: usize) -> AttentionConfig {
        AttentionConfig::new(heads, head_dim)
    }

    /// Sums the last axis of `weights` and checks every row is a distribution.
    fn assert_rows_are_distributions(weights: Tensor<TestBackend, 5>) {
        let cols = weights.dims()[4];
        let flat = values(weights.clone());
        assert!(flat.iter().all(|w| *w >= 0.0));
        for row in flat.chunks(cols) {
            assert_abs_diff_eq!(row.iter().sum::<f32>(), 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_split_then_merge_is_identity() {
        let device = Default::default();
        let x = normal::<4>([2, 3, 4, 6], &device);

        let heads = split_heads(x.clone(), 3);
        assert_eq!(heads.dims(), [2, 3, 3, 4, 2]);
        assert_all_close(merge_heads(heads), x, 0.0);
    }

    #[test]
    fn test_split_keeps_contiguous_feature_groups() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 1>::from_floats([0.0, 1.0, 2.0, 3.0, 4.0, 5.0], &device)
            .reshape([1, 1, 1, 6]);

        let heads = values(split_heads(x, 3));
        // head h owns features 2h, 2h+1
        assert_eq!(heads, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_causal_mask_keeps_diagonal() {
        let device = Default::default();
        let mask: Vec<bool> = causal_mask::<TestBackend>(3, &device)
            .into_data()
            .to_vec()
            .unwrap();
        assert_eq!(
            mask,
            vec![false, true, true, false, false, true, false, false, false]
        );
    }

    #[test]
    fn test_spatial_weights_are_distributions() {
        let device = Default::default();
        let att = config(2, 4).init_spatial::<TestBackend>(&device).unwrap();
        let x   = normal::<4>([2, 3, 5, 8], &device);
        let ste = normal::<4>([2, 3, 5, 8], &device);

        let out = att.forward_with_scores(x, ste, NormCtx::training(0.5));
        assert_eq!(out.context.dims(), [2, 3, 5, 8]);
        assert_eq!(out.weights.dims(), [2, 2, 3, 5, 5]);
        assert_rows_are_distributions(out.weights);
    }

    #[test]
    fn test_spatial_is_permutation_equivariant() {
        let device = Default::default();
        let att = config(2, 3).init_spatial::<TestBackend>(&device).unwrap();
        let x   = normal::<4>([2, 4, 7, 6], &device);
        let ste = normal::<4>([2, 4, 7, 6], &device);

        let mut perm: Vec<i64> = (0..7).collect();
        perm.shuffle(&mut StdRng::seed_from_u64(7));
        let index = Tensor::<TestBackend, 1, Int>::from_data(TensorData::new(perm, [7]), &device);

        let ctx      = NormCtx::inference();
        let expected = att.forward(x.clone(), ste.clone(), ctx).select(2, index.clone());
        let actual   = att.forward(x.select(2, index.clone()), ste.select(2, index), ctx);

        assert_all_close(actual, expected, 1e-4);
    }

    #[test]
    fn test_temporal_causal_ignores_future_steps() {
        let device = Default::default();
        let att = config(2, 4).init_temporal::<TestBackend>(true, &device).unwrap();
        let x   = normal::<4>([2, 6, 3, 8], &device);
        let ste = normal::<4>([2, 6, 3, 8], &device);

        let cut = 2;
        let noise = normal::<4>([2, 6 - cut - 1, 3, 8], &device);
        let x_future   = x.clone().slice_assign([0..2, cut + 1..6, 0..3, 0..8], noise.clone());
        let ste_future = ste.clone().slice_assign([0..2, cut + 1..6, 0..3, 0..8], noise.mul_scalar(3.0));

        let ctx = NormCtx::inference();
        let a = att.forward(x, ste, ctx).slice([0..2, 0..cut + 1, 0..3, 0..8]);
        let b = att.forward(x_future, ste_future, ctx).slice([0..2, 0..cut + 1, 0..3, 0..8]);

        assert_all_close(a, b, 1e-5);
    }

    #[test]
    fn test_temporal_causal_weights_vanish_above_diagonal() {
        let device = Default::default();
        let att = config(1, 4).init_temporal::<TestBackend>(true, &device).unwrap();
        let x   = normal::<4>([1, 4, 2, 4], &device);
        let ste = normal::<4>([1, 4, 2, 4], &device);

        let weights = att.forward_with_scores(x, ste, NormCtx::inference()).weights;
        assert_eq!(weights.dims(), [1, 1, 2, 4, 4]);

        let flat = values(weights.clone());
        for (n, w) in flat.iter().enumerate() {
            let (i, j) = ((n / 4) % 4, n % 4);
            if j > i {
                assert!(*w < 1e-6, "weight ({i}, {j}) = {w}");
            }
        }
        assert_rows_are_distributions(weights);
    }

    #[test]
    fn test_transform_maps_history_to_horizon() {
        let device = Default::default();
        let att = config(2, 2).init_transform::<TestBackend>(&device).unwrap();
        let x        = normal::<4>([3, 5, 4, 4], &device);
        let ste_his  = normal::<4>([3, 5, 4, 4], &device);
        let ste_pred = normal::<4>([3, 2, 4, 4], &device);

        let out = att.forward_with_scores(x, ste_his, ste_pred, NormCtx::training(0.5));
        assert_eq!(out.context.dims(), [3, 2, 4, 4]);
        assert_eq!(out.weights.dims(), [3, 2, 4, 2, 5]);
        assert_rows_are_distributions(out.weights);
    }

    #[test]
    fn test_single_element_axes_give_unit_weights() {
        let device = Default::default();
        let cfg = config(1, 1);
        let x   = normal::<4>([1, 1, 1, 1], &device);
        let ste = normal::<4>([1, 1, 1, 1], &device);
        let ctx = NormCtx::inference();

        let spatial = cfg.init_spatial::<TestBackend>(&device).unwrap()
            .forward_with_scores(x.clone(), ste.clone(), ctx);
        let temporal = cfg.init_temporal::<TestBackend>(true, &device).unwrap()
            .forward_with_scores(x.clone(), ste.clone(), ctx);
        let transform = cfg.init_transform::<TestBackend>(&device).unwrap()
            .forward_with_scores(x, ste.clone(), ste, ctx);

        for w in [spatial.weights, temporal.weights, transform.weights] {
            assert_eq!(values(w), vec![1.0]);
        }
    }

    #[test]
    fn test_zero_heads_is_rejected() {
        let err = config(0, 4).init_spatial::<TestBackend>(&Default::default()).unwrap_err();
        assert_eq!(err, ModelError::ZeroDimension { name: "num_heads" });
    }
}
