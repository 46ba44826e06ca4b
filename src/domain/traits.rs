// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer asks for data through these traits so
// a different storage format only needs a new implementation.

use anyhow::Result;

use crate::domain::{spatial::SpatialEmbedding, traffic::TrafficSeries};

// ─── TrafficSource ────────────────────────────────────────────────────────────
/// Anything that can produce the full reading history.
///
/// Implementations:
///   - CsvTrafficLoader → `timestamp,<sensor...>` CSV files
pub trait TrafficSource {
    fn load_series(&self) -> Result<TrafficSeries>;
}

// ─── EmbeddingSource ──────────────────────────────────────────────────────────
/// Anything that can produce the per-vertex spatial embedding.
///
/// Implementations:
///   - SpatialEmbeddingLoader → node2vec text output
pub trait EmbeddingSource {
    fn load_embedding(&self) -> Result<SpatialEmbedding>;
}
