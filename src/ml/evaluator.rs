// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Runs a trained model over a whole split in order and scores
// the de-normalised predictions against the raw labels.
//
//   dataset ──► chunks of batch_size ──► TrafficBatcher
//           ──► Gman::forecast (Inference mode)
//           ──► inverse scaling ──► [samples, num_pred, V]
//
// The DataLoader is not used here: predictions must stay in
// sample order so they line up with the labels.

use anyhow::{Context, Result};
use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::{
    batcher::{spatial_tensor, TrafficBatcher},
    dataset::TrafficDataset,
    scaler::StandardScaler,
};
use crate::domain::{
    metrics::{masked_metrics, per_step_metrics, ForecastMetrics},
    spatial::SpatialEmbedding,
    traffic::NULL_READING,
};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{model::Gman, norm::NormCtx};

pub type InferBackend = burn::backend::Wgpu;

#[derive(Debug, Clone)]
pub struct SplitReport {
    /// Metrics over every prediction of the split
    pub overall:  ForecastMetrics,
    /// One row per horizon step
    pub per_step: Vec<ForecastMetrics>,
}

impl SplitReport {
    /// Mean of the per-step rows.
    pub fn average(&self) -> ForecastMetrics {
        ForecastMetrics::mean(&self.per_step)
    }
}

pub struct Forecaster<B: Backend> {
    model:      Gman<B>,
    se:         Tensor<B, 2>,
    scaler:     StandardScaler,
    batch_size: usize,
    device:     B::Device,
}

impl Forecaster<InferBackend> {
    /// Rebuilds the model from the saved config and loads the best weights.
    pub fn from_checkpoint(
        ckpt:          &CheckpointManager,
        se:            &SpatialEmbedding,
        scaler:        StandardScaler,
        steps_per_day: usize,
    ) -> Result<Self> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        Self::load(ckpt, se, scaler, steps_per_day, device)
    }
}

impl<B: Backend> Forecaster<B> {
    pub fn load(
        ckpt:          &CheckpointManager,
        se:            &SpatialEmbedding,
        scaler:        StandardScaler,
        steps_per_day: usize,
        device:        B::Device,
    ) -> Result<Self> {
        let cfg       = ckpt.load_config()?;
        let model_cfg = cfg.model_config(se.num_vertex, steps_per_day);
        let model: Gman<B> = model_cfg.init(&device)?;
        let model = ckpt.load_best(model, &device)?;
        tracing::info!("Model loaded from '{}'", ckpt.dir().display());
        Ok(Self::new(model, se, scaler, cfg.batch_size, device))
    }

    pub fn new(
        model:      Gman<B>,
        se:         &SpatialEmbedding,
        scaler:     StandardScaler,
        batch_size: usize,
        device:     B::Device,
    ) -> Self {
        let se = spatial_tensor::<B>(se, &device);
        Self { model, se, scaler, batch_size: batch_size.max(1), device }
    }

    /// De-normalised predictions for every sample, in order.
    pub fn predict(&self, dataset: &TrafficDataset) -> Result<Vec<f32>> {
        let batcher = TrafficBatcher::<B>::new(self.device.clone(), dataset.num_vertex());
        let mut out = Vec::with_capacity(dataset.samples().len() * self.model.num_pred * dataset.num_vertex());

        for chunk in dataset.samples().chunks(self.batch_size) {
            let batch = batcher.batch(chunk.to_vec());
            let pred  = self
                .model
                .forecast(batch.x, batch.te, self.se.clone(), NormCtx::inference())?;
            let values: Vec<f32> = pred
                .into_data()
                .to_vec()
                .map_err(|e| anyhow::anyhow!("{e:?}"))
                .context("reading predictions back from the device")?;
            out.extend(values);
        }

        self.scaler.inverse_all(&mut out);
        Ok(out)
    }

    pub fn evaluate(&self, dataset: &TrafficDataset) -> Result<SplitReport> {
        let predictions = self.predict(dataset)?;
        let labels      = dataset.labels();
        let overall     = masked_metrics(&predictions, &labels, NULL_READING);
        let per_step    = per_step_metrics(
            &predictions,
            &labels,
            self.model.num_pred,
            dataset.num_vertex(),
            NULL_READING,
        );
        Ok(SplitReport { overall, per_step })
    }

    pub fn num_pred(&self) -> usize {
        self.model.num_pred
    }
}
