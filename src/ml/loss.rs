// ============================================================
// Layer 5 — Masked MAE Loss
// ============================================================
// The model predicts in normalised units; labels are raw.
//
//   p̂    = pred · std + mean
//   mask = [label ≠ null]
//   loss = Σ|p̂ − label|·mask / max(Σmask, 1)

use burn::prelude::*;

use crate::data::scaler::StandardScaler;

pub fn masked_mae_loss<B: Backend>(
    pred:       Tensor<B, 3>,
    label:      Tensor<B, 3>,
    scaler:     &StandardScaler,
    null_value: f32,
) -> Tensor<B, 1> {
    let pred  = pred.mul_scalar(scaler.std).add_scalar(scaler.mean);
    let mask  = label.clone().equal_elem(null_value).bool_not().float();
    let count = mask.clone().sum().clamp_min(1.0);

    ((pred - label).abs() * mask).sum().div(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::testing::TestBackend;
    use approx::assert_abs_diff_eq;

    fn tensor(values: [f32; 4]) -> Tensor<TestBackend, 3> {
        Tensor::<TestBackend, 1>::from_floats(values, &Default::default()).reshape([1, 2, 2])
    }

    #[test]
    fn test_loss_is_in_raw_units() {
        let scaler = StandardScaler { mean: 50.0, std: 10.0 };
        // normalised 0.1 → 51
        let loss = masked_mae_loss(tensor([0.1; 4]), tensor([50.0; 4]), &scaler, 0.0);
        assert_abs_diff_eq!(loss.into_scalar(), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_null_labels_do_not_count() {
        let scaler = StandardScaler { mean: 0.0, std: 1.0 };
        let loss = masked_mae_loss(
            tensor([1.0, 1.0, 1.0, 99.0]),
            tensor([2.0, 3.0, 0.0, 0.0]),
            &scaler,
            0.0,
        );
        // (1 + 2) / 2
        assert_abs_diff_eq!(loss.into_scalar(), 1.5, epsilon = 1e-5);
    }

    #[test]
    fn test_all_null_is_zero_not_nan() {
        let scaler = StandardScaler { mean: 0.0, std: 1.0 };
        let loss = masked_mae_loss(tensor([5.0; 4]), tensor([0.0; 4]), &scaler, 0.0);
        assert_eq!(loss.into_scalar(), 0.0);
    }
}
