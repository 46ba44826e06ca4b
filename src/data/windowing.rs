// ============================================================
// Layer 4 — Sliding Windows
// ============================================================
// Cuts a [steps, V] block of readings into overlapping samples:
//
//   num_samples = steps − num_his − num_pred + 1
//
//   sample i:  x  = rows i            .. i + num_his
//              y  = rows i + num_his  .. i + num_his + num_pred
//              te = encodings over the whole span

use anyhow::{bail, Result};

use crate::domain::sample::{TimeEncoding, TrafficSample};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpec {
    pub num_his:  usize,
    pub num_pred: usize,
}

impl WindowSpec {
    pub fn span(&self) -> usize {
        self.num_his + self.num_pred
    }

    pub fn num_samples(&self, steps: usize) -> usize {
        (steps + 1).saturating_sub(self.span())
    }
}

pub fn make_windows(
    readings:   &[f32],
    encodings:  &[TimeEncoding],
    num_vertex: usize,
    spec:       WindowSpec,
) -> Result<Vec<TrafficSample>> {
    let steps = encodings.len();
    if readings.len() != steps * num_vertex {
        bail!(
            "{} readings do not form {steps} rows of {num_vertex} sensors",
            readings.len()
        );
    }
    let count = spec.num_samples(steps);
    if count == 0 {
        bail!(
            "{steps} steps are too few for a window of {} history + {} horizon steps",
            spec.num_his,
            spec.num_pred
        );
    }

    let v = num_vertex;
    let samples = (0..count)
        .map(|i| {
            let his_end  = i + spec.num_his;
            let pred_end = his_end + spec.num_pred;
            TrafficSample {
                x:  readings[i * v..his_end * v].to_vec(),
                te: encodings[i..pred_end].to_vec(),
                y:  readings[his_end * v..pred_end * v].to_vec(),
            }
        })
        .collect();
    Ok(samples)
}
