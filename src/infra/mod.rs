// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Files written next to a training run:
//
//   checkpoint.rs — best model weights, best-epoch pointer and
//                   the TrainConfig needed to rebuild both the
//                   model and the data pipeline
//
//   metrics.rs    — per-epoch training metrics (CSV)
//
//   results.rs    — per-step evaluation metrics and the
//                   sensor-failure matrix (CSV)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// Evaluation result CSV writers
pub mod results;
