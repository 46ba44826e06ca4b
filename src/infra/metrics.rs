// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per training epoch:
//
//   epoch,train_loss,val_loss,learning_rate,bn_momentum,seconds
//   1,5.812300,4.937100,0.001,0.5,41.2
//   2,3.904200,3.551800,0.001,0.5,40.7
//
// Losses are masked MAE in raw reading units. Learning rate and
// momentum are the values in force at the end of the epoch.
//
// Each training run starts a fresh file (see `reset`); rows are
// appended within one run.
//
// Output file: <checkpoint_dir>/metrics.csv

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:         usize,
    pub train_loss:    f64,
    pub val_loss:      f64,
    pub learning_rate: f64,
    pub bn_momentum:   f64,
    /// Wall-clock seconds for training plus validation
    pub seconds:       f64,
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;
        Ok(Self { csv_path: dir.join("metrics.csv") })
    }

    /// Drops rows left by an earlier run.
    pub fn reset(&self) -> Result<()> {
        if self.csv_path.exists() {
            fs::remove_file(&self.csv_path)
                .with_context(|| format!("Cannot remove '{}'", self.csv_path.display()))?;
        }
        Ok(())
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let is_new = !self.csv_path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);
        writer.serialize(m)?;
        writer.flush()?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );
        Ok(())
    }

    #[cfg(test)]
    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    #[cfg(test)]
    pub fn read_all(&self) -> Result<Vec<EpochMetrics>> {
        let mut reader = csv::Reader::from_path(&self.csv_path)
            .with_context(|| format!("Cannot read '{}'", self.csv_path.display()))?;
        reader
            .deserialize()
            .map(|row| row.map_err(anyhow::Error::from))
            .collect()
    }
}
