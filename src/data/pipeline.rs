// ============================================================
// Layer 4 — Data Preparation Pipeline
// ============================================================
//   TrafficSource ──► split rows (train | val | test)
//                 ──► time encodings per row
//                 ──► sliding windows per split
//                 ──► fit scaler on train history, normalise all X
//   EmbeddingSource ► SE, checked against the sensor count

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::TrafficDataset,
    scaler::StandardScaler,
    splitter::{split_chronological, SplitRatios},
    temporal,
    windowing::{make_windows, WindowSpec},
};
use crate::domain::{
    sample::TrafficSample,
    spatial::SpatialEmbedding,
    traffic::TrafficSeries,
    traits::{EmbeddingSource, TrafficSource},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSettings {
    /// Minutes per time step
    pub time_slot: u32,
    pub num_his:   usize,
    pub num_pred:  usize,
    pub ratios:    SplitRatios,
}

pub struct TrafficData {
    pub train:         TrafficDataset,
    pub val:           TrafficDataset,
    pub test:          TrafficDataset,
    pub se:            SpatialEmbedding,
    pub scaler:        StandardScaler,
    pub sensors:       Vec<String>,
    pub steps_per_day: usize,
}

impl TrafficData {
    pub fn load(
        traffic:  &dyn TrafficSource,
        se:       &dyn EmbeddingSource,
        settings: &DataSettings,
    ) -> Result<Self> {
        let series = traffic.load_series()?;
        let se     = se.load_embedding()?;
        Self::prepare(series, se, settings)
    }

    pub fn prepare(series: TrafficSeries, se: SpatialEmbedding, settings: &DataSettings) -> Result<Self> {
        let num_vertex = series.num_sensors();
        if se.num_vertex != num_vertex {
            bail!(
                "spatial embedding has {} vertices but the traffic data has {} sensors",
                se.num_vertex,
                num_vertex
            );
        }

        let steps_per_day = temporal::steps_per_day(settings.time_slot)?;
        let spec = WindowSpec { num_his: settings.num_his, num_pred: settings.num_pred };

        let rows: Vec<usize> = (0..series.num_steps()).collect();
        let (train_rows, val_rows, test_rows) = split_chronological(rows, settings.ratios);

        let windows = |name: &str, rows: &[usize]| -> Result<Vec<TrafficSample>> {
            let range = match (rows.first(), rows.last()) {
                (Some(&a), Some(&b)) => a..b + 1,
                _ => 0..0,
            };
            let part = series.slice(range);
            let te   = temporal::encode_all(&part.timestamps, settings.time_slot);
            make_windows(&part.readings, &te, num_vertex, spec)
                .with_context(|| format!("building {name} windows"))
        };

        let mut train = windows("training", &train_rows)?;
        let mut val   = windows("validation", &val_rows)?;
        let mut test  = windows("test", &test_rows)?;

        let scaler = StandardScaler::fit(&train)?;
        for split in [&mut train, &mut val, &mut test] {
            scaler.transform_samples(split);
        }

        tracing::info!(
            "Windows: {} train, {} validation, {} test (mean={:.3}, std={:.3})",
            train.len(),
            val.len(),
            test.len(),
            scaler.mean,
            scaler.std,
        );

        Ok(Self {
            train: TrafficDataset::new(train, num_vertex),
            val:   TrafficDataset::new(val, num_vertex),
            test:  TrafficDataset::new(test, num_vertex),
            se,
            scaler,
            sensors: series.sensors,
            steps_per_day,
        })
    }

    pub fn num_vertex(&self) -> usize {
        self.sensors.len()
    }
}
