// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Rebuilds the data pipeline from the saved TrainConfig, loads
// the best checkpoint and reports masked MAE / RMSE / MAPE on
// validation and test, per horizon step and on average.
//
// Output file: <results_dir>/step_metrics.csv

use anyhow::Result;
use std::path::PathBuf;

use crate::data::{dataset::TrafficDataset, pipeline::TrafficData};
use crate::domain::metrics::ForecastMetrics;
use crate::infra::{
    checkpoint::CheckpointManager,
    results::{ResultsWriter, StepMetricsRow},
};
use crate::ml::evaluator::{Forecaster, SplitReport};

#[derive(Debug, Clone)]
pub struct EvaluationSummary {
    pub val:  SplitReport,
    pub test: SplitReport,
}

pub struct EvaluateUseCase {
    checkpoint_dir: PathBuf,
    results_dir:    PathBuf,
}

impl EvaluateUseCase {
    pub fn new(checkpoint_dir: impl Into<PathBuf>, results_dir: impl Into<PathBuf>) -> Self {
        Self { checkpoint_dir: checkpoint_dir.into(), results_dir: results_dir.into() }
    }

    pub fn execute(&self) -> Result<EvaluationSummary> {
        let ckpt = CheckpointManager::new(&self.checkpoint_dir)?;
        let data = ckpt.load_config()?.load_data()?;
        self.execute_on(&data)
    }

    /// Evaluates against splits that are already in memory.
    pub fn execute_on(&self, data: &TrafficData) -> Result<EvaluationSummary> {
        let ckpt       = CheckpointManager::new(&self.checkpoint_dir)?;
        let forecaster = Forecaster::from_checkpoint(&ckpt, &data.se, data.scaler, data.steps_per_day)?;

        println!("                MAE\t\tRMSE\t\tMAPE");
        let val  = score("val", &forecaster, &data.val)?;
        let test = score("test", &forecaster, &data.test)?;

        println!("performance in each prediction step");
        for (step, m) in test.per_step.iter().enumerate() {
            print_row(&format!("step: {:02}", step + 1), m);
        }
        print_row("average:", &test.average());

        let mut rows = step_rows("val", &val);
        rows.extend(step_rows("test", &test));
        ResultsWriter::new(&self.results_dir)?.write_step_metrics(&rows)?;

        Ok(EvaluationSummary { val, test })
    }
}

fn score<B: burn::prelude::Backend>(
    split:      &str,
    forecaster: &Forecaster<B>,
    dataset:    &TrafficDataset,
) -> Result<SplitReport> {
    let report = forecaster.evaluate(dataset)?;
    print_row(split, &report.overall);
    tracing::info!(
        "{split}: mae={:.4}, rmse={:.4}, mape={:.4}",
        report.overall.mae,
        report.overall.rmse,
        report.overall.mape,
    );
    Ok(report)
}

fn print_row(label: &str, m: &ForecastMetrics) {
    println!("{:<16}{:.2}\t\t{:.2}\t\t{:.2}%", label, m.mae, m.rmse, m.mape * 100.0);
}

/// One row per horizon step plus the "average" row.
pub fn step_rows(split: &str, report: &SplitReport) -> Vec<StepMetricsRow> {
    let row = |step: String, m: &ForecastMetrics| StepMetricsRow {
        split: split.to_string(),
        step,
        mae:   m.mae,
        rmse:  m.rmse,
        mape:  m.mape * 100.0,
    };
    report
        .per_step
        .iter()
        .enumerate()
        .map(|(i, m)| row((i + 1).to_string(), m))
        .chain(std::iter::once(row("average".to_string(), &report.average())))
        .collect()
}
