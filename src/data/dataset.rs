use burn::data::dataset::Dataset;
use std::sync::Arc;

use crate::domain::sample::TrafficSample;

/// Windowed samples of one split, in chronological order.
/// Clones share the sample storage.
#[derive(Clone)]
pub struct TrafficDataset {
    samples:    Arc<Vec<TrafficSample>>,
    num_vertex: usize,
}

impl TrafficDataset {
    pub fn new(samples: Vec<TrafficSample>, num_vertex: usize) -> Self {
        Self { samples: Arc::new(samples), num_vertex }
    }

    pub fn num_vertex(&self) -> usize { self.num_vertex }

    pub fn samples(&self) -> &[TrafficSample] { &self.samples }

    /// All labels flattened as `[samples, num_pred, V]`.
    pub fn labels(&self) -> Vec<f32> {
        self.samples.iter().flat_map(|s| s.y.iter().copied()).collect()
    }

    /// Same windows with every history rewritten by `f`.
    pub fn map_history(&self, f: impl Fn(&mut [f32])) -> Self {
        let samples = self
            .samples
            .iter()
            .cloned()
            .map(|mut s| {
                f(&mut s.x);
                s
            })
            .collect();
        Self::new(samples, self.num_vertex)
    }
}

impl Dataset<TrafficSample> for TrafficDataset {
    fn get(&self, index: usize) -> Option<TrafficSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
