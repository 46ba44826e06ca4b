// ============================================================
// Layer 2 — SensorFailureUseCase
// ============================================================
// Measures how much each sensor's forecast depends on every
// other sensor:
//
//   Step 1: Predict the validation split as-is
//   Step 2: For each selected sensor s
//             - replace s's history with the null reading
//             - predict again and log the metrics
//             - delta[v, q] = mean(|base − y| − |failed − y|)
//   Step 3: Write the stacked [failed, V, num_pred] matrix
//
// Output file: <results_dir>/sensor_failure.csv

use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::data::{augment::fail_sensor, pipeline::TrafficData};
use crate::domain::{
    metrics::{failure_delta, masked_metrics},
    traffic::NULL_READING,
};
use crate::infra::{
    checkpoint::CheckpointManager,
    results::{FailureRow, ResultsWriter},
};
use crate::ml::evaluator::Forecaster;

pub struct SensorFailureUseCase {
    checkpoint_dir: PathBuf,
    results_dir:    PathBuf,
    /// Sensor ids to fail; empty means every sensor
    sensors:        Vec<String>,
}

impl SensorFailureUseCase {
    pub fn new(
        checkpoint_dir: impl Into<PathBuf>,
        results_dir:    impl Into<PathBuf>,
        sensors:        Vec<String>,
    ) -> Self {
        Self {
            checkpoint_dir: checkpoint_dir.into(),
            results_dir:    results_dir.into(),
            sensors,
        }
    }

    pub fn execute(&self) -> Result<Vec<FailureRow>> {
        let ckpt = CheckpointManager::new(&self.checkpoint_dir)?;
        let data = ckpt.load_config()?.load_data()?;
        let forecaster = Forecaster::from_checkpoint(&ckpt, &data.se, data.scaler, data.steps_per_day)?;

        let rows = self.simulate(&forecaster, &data)?;
        ResultsWriter::new(&self.results_dir)?.write_sensor_failure(&rows)?;
        Ok(rows)
    }

    pub fn simulate<B: burn::prelude::Backend>(
        &self,
        forecaster: &Forecaster<B>,
        data:       &TrafficData,
    ) -> Result<Vec<FailureRow>> {
        let selected = select_sensors(&data.sensors, &self.sensors)?;
        let v        = data.num_vertex();
        let q        = forecaster.num_pred();
        let labels   = data.val.labels();
        let base     = forecaster.predict(&data.val)?;

        tracing::info!("Simulating failure of {} sensors over {} windows", selected.len(), data.val.samples().len());

        let mut rows = Vec::with_capacity(selected.len() * v * q);
        for s in selected {
            let failed_set = fail_sensor(&data.val, s, &data.scaler)?;
            let failed     = forecaster.predict(&failed_set)?;

            let m = masked_metrics(&failed, &labels, NULL_READING);
            tracing::info!(
                "sensor {} failed: mae={:.4}, rmse={:.4}, mape={:.2}%",
                data.sensors[s], m.mae, m.rmse, m.mape * 100.0,
            );

            let delta = failure_delta(&base, &failed, &labels, q, v, NULL_READING);
            for (vertex, per_step) in delta.chunks(q).enumerate() {
                for (step, &d) in per_step.iter().enumerate() {
                    rows.push(FailureRow {
                        failed_sensor: data.sensors[s].clone(),
                        sensor:        data.sensors[vertex].clone(),
                        step:          step + 1,
                        delta:         d,
                    });
                }
            }
        }
        Ok(rows)
    }
}

/// Column indices of the requested sensor ids, in request order.
pub fn select_sensors(all: &[String], requested: &[String]) -> Result<Vec<usize>> {
    if requested.is_empty() {
        return Ok((0..all.len()).collect());
    }
    requested
        .iter()
        .map(|id| match all.iter().position(|s| s == id) {
            Some(i) => Ok(i),
            None    => bail!("unknown sensor '{id}'"),
        })
        .collect()
}
