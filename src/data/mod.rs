// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from files on disk to tensor batches:
//
//   traffic CSV            SE text file
//       │                       │
//       ▼                       ▼
//   CsvTrafficLoader     SpatialEmbeddingLoader
//       │
//       ▼
//   splitter           → chronological train / val / test rows
//       │
//       ▼
//   temporal           → (day_of_week, time_of_day) per row
//       │
//       ▼
//   windowing          → (x, te, y) sliding windows
//       │
//       ▼
//   StandardScaler     → z-score on x, fitted on train
//       │
//       ▼
//   TrafficDataset     → Burn Dataset
//       │
//       ▼
//   TrafficBatcher     → Burn Batcher → DataLoader
//
// augment.rs rewrites a dataset to simulate a failed sensor.

/// CSV traffic readings and node2vec spatial embeddings
pub mod loader;

/// Calendar encoding of timestamps
pub mod temporal;

/// Chronological train / validation / test split
pub mod splitter;

/// Sliding-window sample construction
pub mod windowing;

/// Scalar z-score normalisation
pub mod scaler;

/// Burn Dataset over windowed samples
pub mod dataset;

/// Burn Batcher producing model-ready tensors
pub mod batcher;

/// Simulated sensor failures
pub mod augment;

/// Loader → split → window → normalise, in one call
pub mod pipeline;
