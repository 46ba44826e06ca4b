// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Every burn module, loss and training type lives here.
//
//   error.rs          — typed configuration and shape errors
//   norm.rs           — batch norm over the feature axis, with
//                       Training / Inference mode and momentum
//   fc.rs             — stacked 1×1 projections (linear → BN → act)
//   attention.rs      — spatial, temporal and transform attention
//   fusion.rs         — gated fusion and the ST-attention block
//   embedding.rs      — spatio-temporal embedding (SE + TE)
//   model.rs          — the full encoder / transform / decoder net
//
//   loss.rs           — masked MAE in raw reading units
//   schedule.rs       — staircase learning-rate and BN momentum
//   early_stopping.rs — patience counter + best checkpoint hook
//   trainer.rs        — the training loop
//   evaluator.rs      — ordered prediction and per-step scoring

pub mod error;
pub mod norm;
pub mod fc;
pub mod attention;
pub mod fusion;
pub mod embedding;

/// GMAN forecasting model
pub mod model;

pub mod loss;
pub mod schedule;
pub mod early_stopping;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Loads a checkpoint and scores whole splits
pub mod evaluator;

#[cfg(test)]
pub mod testing;
