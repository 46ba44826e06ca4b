// ============================================================
// Layer 3 — Forecast Error Metrics
// ============================================================
// Every metric ignores positions whose label equals the null
// reading, so missing sensor data never counts as an error.
//
//   MAE  = Σ|p − l| / n
//   RMSE = √(Σ(p − l)² / n)
//   MAPE = Σ|p − l|/|l| / n          (fraction, not percent)
//
// n is the number of non-null labels. With n = 0 every metric is 0.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetrics {
    pub mae:  f64,
    pub rmse: f64,
    pub mape: f64,
}

impl ForecastMetrics {
    /// Element-wise mean of several metric rows.
    pub fn mean(rows: &[ForecastMetrics]) -> Self {
        if rows.is_empty() {
            return Self::default();
        }
        let n = rows.len() as f64;
        Self {
            mae:  rows.iter().map(|m| m.mae).sum::<f64>() / n,
            rmse: rows.iter().map(|m| m.rmse).sum::<f64>() / n,
            mape: rows.iter().map(|m| m.mape).sum::<f64>() / n,
        }
    }
}

pub fn masked_metrics(pred: &[f32], label: &[f32], null_value: f32) -> ForecastMetrics {
    let mut n   = 0usize;
    let mut abs = 0.0f64;
    let mut sq  = 0.0f64;
    let mut pct = 0.0f64;

    for (&p, &l) in pred.iter().zip(label) {
        if l == null_value || l.is_nan() {
            continue;
        }
        let err = (p - l) as f64;
        n   += 1;
        abs += err.abs();
        sq  += err * err;
        pct += err.abs() / (l as f64).abs();
    }

    if n == 0 {
        return ForecastMetrics::default();
    }
    let n = n as f64;
    ForecastMetrics {
        mae:  abs / n,
        rmse: (sq / n).sqrt(),
        mape: pct / n,
    }
}

/// Metrics for each horizon step of `[samples, num_pred, V]` predictions.
pub fn per_step_metrics(
    pred:       &[f32],
    label:      &[f32],
    num_pred:   usize,
    num_vertex: usize,
    null_value: f32,
) -> Vec<ForecastMetrics> {
    let stride = num_pred * num_vertex;
    (0..num_pred)
        .map(|step| {
            let pick = |data: &[f32]| -> Vec<f32> {
                data.chunks(stride)
                    .flat_map(|sample| sample[step * num_vertex..(step + 1) * num_vertex].iter().copied())
                    .collect()
            };
            masked_metrics(&pick(pred), &pick(label), null_value)
        })
        .collect()
}

/// Mean change in absolute error when one sensor's history is lost.
///
/// `err = [l ≠ null] · (|base − l| − |failed − l|)` averaged over samples,
/// returned as `[V, num_pred]` (vertex-major) so each row is one sensor's
/// response across the horizon.
pub fn failure_delta(
    base:       &[f32],
    failed:     &[f32],
    label:      &[f32],
    num_pred:   usize,
    num_vertex: usize,
    null_value: f32,
) -> Vec<f64> {
    let stride  = num_pred * num_vertex;
    let samples = label.len() / stride.max(1);
    let mut sum = vec![0.0f64; stride];

    for ((b, f), l) in base.chunks(stride).zip(failed.chunks(stride)).zip(label.chunks(stride)) {
        for (i, acc) in sum.iter_mut().enumerate() {
            if l[i] == null_value {
                continue;
            }
            *acc += ((b[i] - l[i]).abs() - (f[i] - l[i]).abs()) as f64;
        }
    }

    let n = samples.max(1) as f64;
    let mut out = vec![0.0f64; stride];
    for step in 0..num_pred {
        for v in 0..num_vertex {
            out[v * num_pred + step] = sum[step * num_vertex + v] / n;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_null_labels_are_ignored() {
        let m = masked_metrics(&[1.0, 100.0, 3.0], &[2.0, 0.0, 6.0], 0.0);
        // errors 1 and 3 over two valid labels
        assert_abs_diff_eq!(m.mae, 2.0);
        assert_abs_diff_eq!(m.rmse, (10.0f64 / 2.0).sqrt());
        assert_abs_diff_eq!(m.mape, (0.5 + 0.5) / 2.0);
    }

    #[test]
    fn test_all_null_gives_zero() {
        assert_eq!(masked_metrics(&[1.0, 2.0], &[0.0, 0.0], 0.0), ForecastMetrics::default());
    }

    #[test]
    fn test_per_step_splits_horizon() {
        // two samples, two steps, one vertex
        let pred  = [1.0, 10.0, 3.0, 10.0];
        let label = [2.0, 12.0, 2.0, 14.0];
        let steps = per_step_metrics(&pred, &label, 2, 1, 0.0);

        assert_eq!(steps.len(), 2);
        assert_abs_diff_eq!(steps[0].mae, 1.0);
        assert_abs_diff_eq!(steps[1].mae, 3.0);
        assert_abs_diff_eq!(ForecastMetrics::mean(&steps).mae, 2.0);
    }

    #[test]
    fn test_failure_delta_is_vertex_major() {
        // one sample, two steps, two vertices
        let label  = [10.0, 20.0, 30.0, 40.0];
        let base   = [11.0, 20.0, 30.0, 44.0];
        let failed = [13.0, 21.0, 30.0, 40.0];
        let delta  = failure_delta(&base, &failed, &label, 2, 2, 0.0);

        // [v0s0, v0s1, v1s0, v1s1]
        assert_eq!(delta, vec![-2.0, 0.0, -1.0, 4.0]);
    }

    #[test]
    fn test_failure_delta_skips_nulls_and_averages() {
        let label  = [0.0, 5.0];
        let base   = [9.0, 5.0];
        let failed = [1.0, 7.0];
        // two samples, one step, one vertex
        let delta  = failure_delta(&base, &failed, &label, 1, 1, 0.0);
        assert_abs_diff_eq!(delta[0], -1.0);
    }
}
