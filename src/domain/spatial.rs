// ============================================================
// Layer 3 — Spatial Embedding
// ============================================================
// One D-wide vector per vertex, row i belonging to sensor i.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialEmbedding {
    pub num_vertex: usize,
    pub dim:        usize,
    /// Row-major `[num_vertex, dim]`
    pub values:     Vec<f32>,
}

impl SpatialEmbedding {
    pub fn new(num_vertex: usize, dim: usize, values: Vec<f32>) -> Self {
        debug_assert_eq!(values.len(), num_vertex * dim);
        Self { num_vertex, dim, values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_are_row_major() {
        let se = SpatialEmbedding::new(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(&se.values[se.dim..], &[4.0, 5.0, 6.0]);
    }
}
