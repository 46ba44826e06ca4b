// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights with Burn's MessagePack + gzip
// recorder, keeping full f32 precision for weights and running stats.
//
// Only the best model (lowest validation loss) is kept:
//
//   checkpoints/
//     model_best.mpk.gz    ← weights + batch-norm running stats
//     best_epoch.json      ← { "epoch": 7, "val_loss": 3.21 }
//     train_config.json    ← everything needed to rebuild the
//                            model and the data pipeline
//
// Loading fails if the rebuilt architecture does not match
// the record on disk.

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::Gman;

const MODEL_FILE:  &str = "model_best";
const BEST_FILE:   &str = "best_epoch.json";
const CONFIG_FILE: &str = "train_config.json";

type CheckpointRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestEpoch {
    pub epoch:    usize,
    pub val_loss: f64,
}

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Overwrites the best checkpoint and its epoch pointer.
    pub fn save_best<B: Backend>(&self, model: &Gman<B>, best: BestEpoch) -> Result<()> {
        let path = self.dir.join(MODEL_FILE);

        CheckpointRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let best_path = self.dir.join(BEST_FILE);
        fs::write(&best_path, serde_json::to_string_pretty(&best)?)
            .with_context(|| format!("Failed to write '{}'", best_path.display()))?;

        tracing::debug!("Saved best checkpoint: epoch {} (val_loss={:.4})", best.epoch, best.val_loss);
        Ok(())
    }

    /// Loads the best weights into a freshly built `model`.
    pub fn load_best<B: Backend>(&self, model: Gman<B>, device: &B::Device) -> Result<Gman<B>> {
        let best = self.best_epoch()?;
        let path = self.dir.join(MODEL_FILE);

        tracing::info!("Loading checkpoint from epoch {} (val_loss={:.4})", best.epoch, best.val_loss);

        let record = CheckpointRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?", path.display())
            })?;

        Ok(model.load_record(record))
    }

    pub fn best_epoch(&self) -> Result<BestEpoch> {
        let path = self.dir.join(BEST_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot find '{}'. Have you run 'train' first?", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Make sure you have run 'train' first.",
                path.display()
            )
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid training config in '{}'", path.display()))
    }
}
