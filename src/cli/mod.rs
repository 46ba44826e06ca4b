// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and routes each subcommand to its
// use case in Layer 2:
//
//   train            — fit GMAN on a traffic CSV + spatial embedding
//   evaluate         — score the best checkpoint on validation + test
//   simulate-failure — null out sensors one at a time, record the
//                      change in error at every other sensor

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, FailureArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "gman-traffic",
    version = "0.1.0",
    about = "Train and evaluate a graph multi-attention network for traffic forecasting."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Routes only; every computation happens in the use cases.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)           => run_train(args),
            Commands::Evaluate(args)        => run_evaluate(args),
            Commands::SimulateFailure(args) => run_failure(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on '{}'", args.traffic_file);
    let outcome = TrainUseCase::new(args.into()).execute()?;

    match outcome.best {
        Some(best) => println!(
            "Training complete. Best epoch {} (val_loss={:.4}) after {} epochs; {} parameters, decay every {} steps.",
            best.epoch, best.val_loss, outcome.epochs_run, outcome.num_params, outcome.decay_steps
        ),
        None => println!("Training stopped before any epoch completed."),
    }
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let summary = EvaluateUseCase::new(&args.checkpoint_dir, &args.results_dir).execute()?;
    for (split, report) in [("Validation", &summary.val), ("Test", &summary.test)] {
        let avg = report.average();
        println!(
            "{split} average: MAE {:.2}, RMSE {:.2}, MAPE {:.2}%",
            avg.mae, avg.rmse, avg.mape * 100.0,
        );
    }
    Ok(())
}

fn run_failure(args: FailureArgs) -> Result<()> {
    use crate::application::failure_use_case::SensorFailureUseCase;

    let rows = SensorFailureUseCase::new(&args.checkpoint_dir, &args.results_dir, args.sensors).execute()?;
    println!("\nWrote {} sensor-failure rows to '{}'.", rows.len(), args.results_dir);
    Ok(())
}
