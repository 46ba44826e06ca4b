// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types describing the forecasting problem:
// sensor readings over time, the static per-sensor embedding,
// windowed samples and the error metrics used to judge them.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//   - Only structs, enums, traits and pure arithmetic

/// Sensor readings on a fixed time grid
pub mod traffic;

/// Static per-vertex spatial embedding (node2vec output)
pub mod spatial;

/// One (history, time encoding, horizon) training window
pub mod sample;

/// Masked MAE / RMSE / MAPE
pub mod metrics;

/// Abstractions implemented by the data layer
pub mod traits;
