// Shared helpers for the model tests.

use burn::{backend::NdArray, prelude::*, tensor::Distribution};

pub type TestBackend = NdArray<f32>;

pub fn normal<const D: usize>(shape: [usize; D], device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, D> {
    Tensor::random(shape, Distribution::Normal(0.0, 1.0), device)
}

pub fn values<const D: usize>(t: Tensor<TestBackend, D>) -> Vec<f32> {
    t.into_data().to_vec::<f32>().unwrap()
}

pub fn assert_all_close<const D: usize>(a: Tensor<TestBackend, D>, b: Tensor<TestBackend, D>, tol: f32) {
    assert_eq!(a.dims(), b.dims());
    for (i, (x, y)) in values(a).iter().zip(values(b)).enumerate() {
        assert!((x - y).abs() <= tol, "element {i}: {x} vs {y}");
    }
}
