// ============================================================
// Layer 6 — Evaluation Result Writers
// ============================================================
// step_metrics.csv    split,step,mae,rmse,mape
//                     one row per horizon step plus an "average"
//                     row, for validation and test
//
// sensor_failure.csv  failed_sensor,sensor,step,delta
//                     mean change in absolute error at `sensor`,
//                     horizon `step`, when `failed_sensor` reads null

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepMetricsRow {
    pub split: String,
    /// 1-based horizon step, or "average"
    pub step:  String,
    pub mae:   f64,
    pub rmse:  f64,
    /// Percent
    pub mape:  f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRow {
    pub failed_sensor: String,
    pub sensor:        String,
    /// 1-based horizon step
    pub step:          usize,
    pub delta:         f64,
}

pub struct ResultsWriter {
    dir: PathBuf,
}

impl ResultsWriter {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create results directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn write_step_metrics(&self, rows: &[StepMetricsRow]) -> Result<PathBuf> {
        self.write("step_metrics.csv", rows)
    }

    pub fn write_sensor_failure(&self, rows: &[FailureRow]) -> Result<PathBuf> {
        self.write("sensor_failure.csv", rows)
    }

    fn write<T: Serialize>(&self, name: &str, rows: &[T]) -> Result<PathBuf> {
        let path = self.dir.join(name);
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Cannot create '{}'", path.display()))?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        tracing::info!("Wrote {} rows to '{}'", rows.len(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_step_metrics_file() {
        let tmp    = tempdir().unwrap();
        let writer = ResultsWriter::new(tmp.path()).unwrap();
        let path   = writer
            .write_step_metrics(&[StepMetricsRow {
                split: "test".into(),
                step:  "average".into(),
                mae:   2.5,
                rmse:  4.0,
                mape:  6.25,
            }])
            .unwrap();

        let text = fs::read_to_string(path).unwrap();
        assert_eq!(text, "split,step,mae,rmse,mape\ntest,average,2.5,4.0,6.25\n");
    }

    #[test]
    fn test_sensor_failure_header() {
        let tmp    = tempdir().unwrap();
        let writer = ResultsWriter::new(tmp.path()).unwrap();
        let path   = writer
            .write_sensor_failure(&[FailureRow {
                failed_sensor: "773869".into(),
                sensor:        "767541".into(),
                step:          1,
                delta:         -0.5,
            }])
            .unwrap();

        let text = fs::read_to_string(path).unwrap();
        assert!(text.starts_with("failed_sensor,sensor,step,delta\n773869,767541,1,-0.5"));
    }
}
