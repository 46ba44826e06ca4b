// ============================================================
// Layer 5 — Spatio-Temporal Embedding (STE)
// ============================================================
//   SE [V, D]          → FC → [1, 1, V, D]
//   TE [B, S, 2]       → one-hot(dow, 7) ‖ one-hot(tod, T)
//                      → FC → [B, S, 1, D]
//   STE = SE + TE      broadcast to [B, S, V, D]

use burn::{prelude::*, tensor::Int};

use crate::ml::error::ModelError;
use crate::ml::fc::{Fc, FcConfig};
use crate::ml::norm::NormCtx;

pub const DAYS_PER_WEEK: usize = 7;

#[derive(Config, Debug)]
pub struct StEmbeddingConfig {
    /// Width of the spatial embedding rows and of the output (D)
    pub d_model:       usize,
    /// Time-of-day slots per day (T)
    pub steps_per_day: usize,
    #[config(default = true)]
    pub batch_norm:    bool,
}

impl StEmbeddingConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<StEmbedding<B>, ModelError> {
        if self.steps_per_day == 0 {
            return Err(ModelError::ZeroDimension { name: "steps_per_day" });
        }
        let d = self.d_model;
        Ok(StEmbedding {
            spatial: FcConfig::two_stage(d, d, d)
                .with_batch_norm(self.batch_norm)
                .init(device)?,
            temporal: FcConfig::two_stage(DAYS_PER_WEEK + self.steps_per_day, d, d)
                .with_batch_norm(self.batch_norm)
                .init(device)?,
            steps_per_day: self.steps_per_day,
        })
    }
}

#[derive(Module, Debug)]
pub struct StEmbedding<B: Backend> {
    pub spatial:       Fc<B>,
    pub temporal:      Fc<B>,
    pub steps_per_day: usize,
}

impl<B: Backend> StEmbedding<B> {
    /// se: [V, D], te: [B, S, 2] → [B, S, V, D]
    pub fn forward(&self, se: Tensor<B, 2>, te: Tensor<B, 3, Int>, ctx: NormCtx) -> Tensor<B, 4> {
        let [vertices, d_se] = se.dims();
        let [batch, steps, _] = te.dims();

        let se = self.spatial.forward(se.reshape([1, 1, vertices, d_se]), ctx);
        let d  = se.dims()[3];

        let day_of_week = one_hot(te.clone().slice([0..batch, 0..steps, 0..1]), DAYS_PER_WEEK);
        let time_of_day = one_hot(te.slice([0..batch, 0..steps, 1..2]), self.steps_per_day);
        let te = self.temporal.forward(Tensor::cat(vec![day_of_week, time_of_day], 3), ctx);

        se.expand([batch, steps, vertices, d]) + te.expand([batch, steps, vertices, d])
    }
}

/// [B, S, 1] class indices → [B, S, 1, depth]; indices outside `0..depth` give a zero row.
pub fn one_hot<B: Backend>(index: Tensor<B, 3, Int>, depth: usize) -> Tensor<B, 4> {
    let [batch, steps, _] = index.dims();
    let shape   = [batch, steps, 1, depth];
    let classes = Tensor::<B, 1, Int>::arange(0..depth as i64, &index.device())
        .reshape([1, 1, 1, depth])
        .expand(shape);

    index.reshape([batch, steps, 1, 1])
        .expand(shape)
        .equal(classes)
        .float()
}
