// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load readings + spatial embedding   (Layer 4 - data)
//   Step 2: Split, window and normalise         (Layer 4 - data)
//   Step 3: Save config next to the checkpoint  (Layer 6 - infra)
//   Step 4: Run training loop                   (Layer 5 - ml)
//   Step 5: Score the best checkpoint           (Layer 2 - evaluate)

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::application::evaluate_use_case::EvaluateUseCase;
use crate::data::{
    loader::{CsvTrafficLoader, SpatialEmbeddingLoader},
    pipeline::{DataSettings, TrafficData},
    splitter::SplitRatios,
};
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::{
    model::GmanConfig,
    trainer::{run_training, TrainingOutcome},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything needed to rebuild both the data pipeline and the
// model. Saved as train_config.json; `evaluate` and
// `simulate-failure` read it back instead of taking flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub traffic_file:   String,
    pub se_file:        String,
    pub checkpoint_dir: String,
    pub results_dir:    String,
    /// Minutes per time step
    pub time_slot:      u32,
    pub num_his:        usize,
    pub num_pred:       usize,
    pub num_blocks:     usize,
    pub num_heads:      usize,
    pub head_dim:       usize,
    pub train_ratio:    f64,
    pub val_ratio:      f64,
    pub test_ratio:     f64,
    pub batch_size:     usize,
    pub max_epoch:      usize,
    pub patience:       usize,
    pub learning_rate:  f64,
    pub decay_epoch:    usize,
    pub seed:           u64,
    pub batch_norm:     bool,
    pub causal_encoder: bool,
    pub causal_decoder: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            traffic_file:   "data/metr-la/traffic.csv".to_string(),
            se_file:        "data/metr-la/SE.txt".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            results_dir:    "results".to_string(),
            time_slot:      5,
            num_his:        12,
            num_pred:       12,
            num_blocks:     1,
            num_heads:      8,
            head_dim:       8,
            train_ratio:    0.7,
            val_ratio:      0.1,
            test_ratio:     0.2,
            batch_size:     32,
            max_epoch:      1000,
            patience:       10,
            learning_rate:  0.001,
            decay_epoch:    5,
            seed:           42,
            batch_norm:     true,
            causal_encoder: false,
            causal_decoder: false,
        }
    }
}

impl TrainConfig {
    pub fn model_config(&self, num_vertex: usize, steps_per_day: usize) -> GmanConfig {
        GmanConfig::new(self.num_his, self.num_pred, num_vertex, steps_per_day)
            .with_num_blocks(self.num_blocks)
            .with_num_heads(self.num_heads)
            .with_head_dim(self.head_dim)
            .with_batch_norm(self.batch_norm)
            .with_causal_encoder(self.causal_encoder)
            .with_causal_decoder(self.causal_decoder)
    }

    pub fn data_settings(&self) -> Result<DataSettings> {
        Ok(DataSettings {
            time_slot: self.time_slot,
            num_his:   self.num_his,
            num_pred:  self.num_pred,
            ratios:    SplitRatios::new(self.train_ratio, self.val_ratio, self.test_ratio)?,
        })
    }

    /// Reads both input files and prepares every split.
    pub fn load_data(&self) -> Result<TrafficData> {
        tracing::info!("Loading readings from '{}'", self.traffic_file);
        tracing::info!("Loading spatial embedding from '{}'", self.se_file);
        TrafficData::load(
            &CsvTrafficLoader::new(&self.traffic_file),
            &SpatialEmbeddingLoader::new(&self.se_file),
            &self.data_settings()?,
        )
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Trains, then evaluates the best checkpoint on validation and test.
    pub fn execute(&self) -> Result<TrainingOutcome> {
        let cfg = &self.config;

        // ── Steps 1–2: Load and prepare every split ──────────────────────────
        let data = cfg.load_data()?;
        tracing::info!(
            "{} sensors, {} slots per day, {} training windows",
            data.num_vertex(),
            data.steps_per_day,
            data.train.samples().len(),
        );

        // ── Step 3: Save config for evaluate / simulate-failure ──────────────
        let ckpt   = CheckpointManager::new(&cfg.checkpoint_dir)?;
        let logger = MetricsLogger::new(&cfg.checkpoint_dir)?;
        ckpt.save_config(cfg)?;

        // ── Step 4: Run training loop (Layer 5) ──────────────────────────────
        let outcome = run_training(cfg, &data, &ckpt, &logger)?;

        // ── Step 5: Score the best checkpoint ────────────────────────────────
        if outcome.best.is_some() {
            EvaluateUseCase::new(&cfg.checkpoint_dir, &cfg.results_dir).execute_on(&data)?;
        } else {
            tracing::warn!("No checkpoint was saved, skipping evaluation");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_the_reference_setup() {
        let cfg = TrainConfig::default();
        assert_eq!((cfg.num_his, cfg.num_pred), (12, 12));
        assert_eq!(cfg.model_config(207, 288).d_model(), 64);
        assert!(cfg.data_settings().is_ok());
    }

    #[test]
    fn test_model_config_carries_flags() {
        let cfg = TrainConfig {
            num_blocks:     3,
            batch_norm:     false,
            causal_decoder: true,
            ..TrainConfig::default()
        };
        let model = cfg.model_config(10, 96);
        assert_eq!(model.num_blocks, 3);
        assert_eq!(model.num_vertex, 10);
        assert_eq!(model.steps_per_day, 96);
        assert!(!model.batch_norm);
        assert!(!model.causal_encoder);
        assert!(model.causal_decoder);
    }

    #[test]
    fn test_bad_ratios_are_rejected() {
        let cfg = TrainConfig { test_ratio: 0.5, ..TrainConfig::default() };
        assert!(cfg.data_settings().is_err());
    }

    #[test]
    fn test_config_json_round_trip() {
        let cfg  = TrainConfig { seed: 7, causal_encoder: true, ..TrainConfig::default() };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: TrainConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.seed, 7);
        assert!(back.causal_encoder);
        assert_eq!(back.traffic_file, cfg.traffic_file);
        assert_eq!(back.batch_size, cfg.batch_size);
    }
}
