// ============================================================
// Layer 4 — Chronological Train / Validation / Test Splitter
// ============================================================
// Time series must not be shuffled before splitting: the
// validation and test periods come strictly after training.
//
//   train = round(train_ratio · N)
//   test  = round(test_ratio  · N)
//   val   = N − train − test
//
//   [ ─────── train ─────── | ── val ── | ──── test ──── ]

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitRatios {
    pub train: f64,
    pub val:   f64,
    pub test:  f64,
}

impl SplitRatios {
    pub fn new(train: f64, val: f64, test: f64) -> Result<Self> {
        if [train, val, test].iter().any(|r| !(0.0..=1.0).contains(r)) {
            bail!("split ratios must lie in [0, 1], got {train}/{val}/{test}");
        }
        if (train + val + test - 1.0).abs() > 1e-6 {
            bail!("split ratios must sum to 1, got {}", train + val + test);
        }
        Ok(Self { train, val, test })
    }

    /// (train, val, test) sizes for `total` rows.
    pub fn sizes(&self, total: usize) -> (usize, usize, usize) {
        let train = ((total as f64) * self.train).round() as usize;
        let test  = ((total as f64) * self.test).round() as usize;
        let train = train.min(total);
        let test  = test.min(total - train);
        (train, total - train - test, test)
    }
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self { train: 0.7, val: 0.1, test: 0.2 }
    }
}

/// Splits `items` in order into (train, val, test).
pub fn split_chronological<T>(mut items: Vec<T>, ratios: SplitRatios) -> (Vec<T>, Vec<T>, Vec<T>) {
    let total = items.len();
    let (train, val, _) = ratios.sizes(total);

    let test = items.split_off(train + val);
    let val  = items.split_off(train);

    tracing::debug!(
        "Chronological split: {} train, {} validation, {} test",
        items.len(),
        val.len(),
        test.len(),
    );
    (items, val, test)
}
