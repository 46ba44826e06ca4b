// ============================================================
// Layer 4 — Z-Score Scaler
// ============================================================
// A single scalar mean and standard deviation, fitted on every
// history value of the training samples. Inputs are normalised;
// labels stay in raw units and predictions are mapped back with
// the inverse transform before the loss and the metrics.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::domain::sample::TrafficSample;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: f64,
    pub std:  f64,
}

impl StandardScaler {
    /// Population mean / std over all `x` values of `samples`.
    pub fn fit(samples: &[TrafficSample]) -> Result<Self> {
        let n: usize = samples.iter().map(|s| s.x.len()).sum();
        if n == 0 {
            bail!("cannot fit a scaler on an empty training set");
        }
        let values = || samples.iter().flat_map(|s| s.x.iter().map(|&v| v as f64));

        let mean = values().sum::<f64>() / n as f64;
        let var  = values().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        let std  = var.sqrt();
        if std.is_nan() || std <= 0.0 {
            bail!("training readings are constant ({mean}); cannot normalise");
        }
        Ok(Self { mean, std })
    }

    pub fn transform(&self, v: f32) -> f32 {
        ((v as f64 - self.mean) / self.std) as f32
    }

    pub fn inverse(&self, v: f32) -> f32 {
        (v as f64 * self.std + self.mean) as f32
    }

    /// Normalises the history of every sample in place.
    pub fn transform_samples(&self, samples: &mut [TrafficSample]) {
        for s in samples {
            s.x.iter_mut().for_each(|v| *v = self.transform(*v));
        }
    }

    pub fn inverse_all(&self, values: &mut [f32]) {
        values.iter_mut().for_each(|v| *v = self.inverse(*v));
    }
}
