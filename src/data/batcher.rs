// ============================================================
// Layer 4 — Traffic Batcher
// ============================================================
// Implements Burn's Batcher trait: stacks N TrafficSamples
// into one TrafficBatch.
//
//   x:  N × [num_his · V]          → [N, num_his, V]
//   te: N × [(num_his+num_pred)]   → [N, num_his + num_pred, 2]  (Int)
//   y:  N × [num_pred · V]         → [N, num_pred, V]
//
// Samples of one split all share their window sizes, so the
// flat vectors are concatenated and reshaped once.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::domain::{sample::TrafficSample, spatial::SpatialEmbedding};

#[derive(Debug, Clone)]
pub struct TrafficBatch<B: Backend> {
    /// Normalised history — [batch, num_his, V]
    pub x:  Tensor<B, 3>,
    /// (day_of_week, time_of_day) — [batch, num_his + num_pred, 2]
    pub te: Tensor<B, 3, Int>,
    /// Raw future readings — [batch, num_pred, V]
    pub y:  Tensor<B, 3>,
}

#[derive(Clone, Debug)]
pub struct TrafficBatcher<B: Backend> {
    pub device:     B::Device,
    pub num_vertex: usize,
}

impl<B: Backend> TrafficBatcher<B> {
    pub fn new(device: B::Device, num_vertex: usize) -> Self {
        Self { device, num_vertex }
    }
}

impl<B: Backend> Batcher<TrafficSample, TrafficBatch<B>> for TrafficBatcher<B> {
    fn batch(&self, items: Vec<TrafficSample>) -> TrafficBatch<B> {
        let n = items.len();
        let v = self.num_vertex;
        let (num_his, num_pred, span) = items
            .first()
            .map(|s| (s.num_his(v), s.num_pred(v), s.te.len()))
            .unwrap_or((0, 0, 0));

        let x: Vec<f32> = items.iter().flat_map(|s| s.x.iter().copied()).collect();
        let y: Vec<f32> = items.iter().flat_map(|s| s.y.iter().copied()).collect();
        let te: Vec<i64> = items
            .iter()
            .flat_map(|s| s.te.iter())
            .flat_map(|e| [e.day_of_week as i64, e.time_of_day as i64])
            .collect();

        TrafficBatch {
            x:  Tensor::from_data(TensorData::new(x, [n, num_his, v]), &self.device),
            te: Tensor::from_data(TensorData::new(te, [n, span, 2]), &self.device),
            y:  Tensor::from_data(TensorData::new(y, [n, num_pred, v]), &self.device),
        }
    }
}

/// The spatial embedding as a [V, D] tensor.
pub fn spatial_tensor<B: Backend>(se: &SpatialEmbedding, device: &B::Device) -> Tensor<B, 2> {
    Tensor::from_data(
        TensorData::new(se.values.clone(), [se.num_vertex, se.dim]),
        device,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::TimeEncoding;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn sample(offset: f32) -> TrafficSample {
        TrafficSample {
            // num_his = 2, V = 3
            x:  (0..6).map(|i| offset + i as f32).collect(),
            te: (0..3).map(|t| TimeEncoding { day_of_week: 4, time_of_day: t }).collect(),
            // num_pred = 1
            y:  vec![offset; 3],
        }
    }

    #[test]
    fn test_batch_shapes() {
        let batcher = TrafficBatcher::<TestBackend>::new(Default::default(), 3);
        let batch   = batcher.batch(vec![sample(0.0), sample(100.0)]);

        assert_eq!(batch.x.dims(), [2, 2, 3]);
        assert_eq!(batch.te.dims(), [2, 3, 2]);
        assert_eq!(batch.y.dims(), [2, 1, 3]);
    }

    #[test]
    fn test_batch_keeps_sample_order() {
        let batcher = TrafficBatcher::<TestBackend>::new(Default::default(), 3);
        let batch   = batcher.batch(vec![sample(0.0), sample(100.0)]);

        let x: Vec<f32> = batch.x.into_data().to_vec().unwrap();
        assert_eq!(x[5], 5.0);
        assert_eq!(x[6], 100.0);

        let te: Vec<i64> = batch.te.into_data().convert::<i64>().to_vec().unwrap();
        assert_eq!(&te[..6], &[4, 0, 4, 1, 4, 2]);
    }

    #[test]
    fn test_spatial_tensor_shape() {
        let se = SpatialEmbedding::new(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
        let t  = spatial_tensor::<TestBackend>(&se, &Default::default());
        assert_eq!(t.dims(), [2, 2]);
    }
}
