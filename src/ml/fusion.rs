// ============================================================
// Layer 5 — Gated Fusion + Spatio-Temporal Attention Block
// ============================================================
//   XS = FC(HS)        identity, no bias
//   XT = FC(HT)        identity, bias
//   z  = σ(XS + XT)
//   H  = z⊙HS + (1 − z)⊙HT   → two-stage FC
//
// The block wires spatial and temporal attention through the
// gate and adds a residual connection around the whole thing.

use burn::{prelude::*, tensor::activation::sigmoid};

use crate::ml::attention::{AttentionConfig, SpatialAttention, TemporalAttention};
use crate::ml::error::ModelError;
use crate::ml::fc::{Activation, Fc, FcConfig};
use crate::ml::norm::NormCtx;

#[derive(Config, Debug)]
pub struct GatedFusionConfig {
    pub d_model: usize,
    #[config(default = true)]
    pub batch_norm: bool,
}

impl GatedFusionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<GatedFusion<B>, ModelError> {
        let d = self.d_model;
        Ok(GatedFusion {
            spatial: FcConfig::single(d, d, Activation::Identity)
                .with_use_bias(false)
                .with_batch_norm(self.batch_norm)
                .init(device)?,
            temporal: FcConfig::single(d, d, Activation::Identity)
                .with_batch_norm(self.batch_norm)
                .init(device)?,
            output: FcConfig::two_stage(d, d, d)
                .with_batch_norm(self.batch_norm)
                .init(device)?,
        })
    }
}

#[derive(Module, Debug)]
pub struct GatedFusion<B: Backend> {
    pub spatial:  Fc<B>,
    pub temporal: Fc<B>,
    pub output:   Fc<B>,
}

impl<B: Backend> GatedFusion<B> {
    /// hs, ht: [batch, step, vertex, D] → [batch, step, vertex, D]
    pub fn forward(&self, hs: Tensor<B, 4>, ht: Tensor<B, 4>, ctx: NormCtx) -> Tensor<B, 4> {
        let (_, fused) = self.fuse(hs, ht, ctx);
        self.output.forward(fused, ctx)
    }

    /// Returns the gate `z` and the convex combination before the output projection.
    pub fn fuse(&self, hs: Tensor<B, 4>, ht: Tensor<B, 4>, ctx: NormCtx) -> (Tensor<B, 4>, Tensor<B, 4>) {
        let xs = self.spatial.forward(hs.clone(), ctx);
        let xt = self.temporal.forward(ht.clone(), ctx);
        let z  = sigmoid(xs + xt);

        let fused = z.clone() * hs + z.clone().neg().add_scalar(1.0) * ht;
        (z, fused)
    }
}

// ─── ST-Attention block ───────────────────────────────────────

#[derive(Config, Debug)]
pub struct StAttBlockConfig {
    pub num_heads: usize,
    pub head_dim:  usize,
    #[config(default = true)]
    pub batch_norm: bool,
    #[config(default = false)]
    pub causal: bool,
}

impl StAttBlockConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<StAttBlock<B>, ModelError> {
        let attention = AttentionConfig::new(self.num_heads, self.head_dim)
            .with_batch_norm(self.batch_norm);
        Ok(StAttBlock {
            spatial:  attention.init_spatial(device)?,
            temporal: attention.init_temporal(self.causal, device)?,
            fusion:   GatedFusionConfig::new(attention.d_model())
                .with_batch_norm(self.batch_norm)
                .init(device)?,
        })
    }
}

#[derive(Module, Debug)]
pub struct StAttBlock<B: Backend> {
    pub spatial:  SpatialAttention<B>,
    pub temporal: TemporalAttention<B>,
    pub fusion:   GatedFusion<B>,
}

impl<B: Backend> StAttBlock<B> {
    /// x, ste: [batch, step, vertex, D] → x + H
    pub fn forward(&self, x: Tensor<B, 4>, ste: Tensor<B, 4>, ctx: NormCtx) -> Tensor<B, 4> {
        let hs = self.spatial.forward(x.clone(), ste.clone(), ctx);
        let ht = self.temporal.forward(x.clone(), ste, ctx);
        let h  = self.fusion.forward(hs, ht, ctx);
        x + h
    }
}
