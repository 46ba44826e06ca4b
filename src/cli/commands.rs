// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// `train` takes every hyperparameter as a flag and turns them
// into a TrainConfig. `evaluate` and `simulate-failure` only
// need the checkpoint directory: the rest is read back from
// train_config.json.

use clap::{Args, Subcommand};
use crate::application::train_use_case::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train GMAN on a traffic CSV and a spatial embedding
    Train(TrainArgs),

    /// Score the best checkpoint on validation and test
    Evaluate(EvaluateArgs),

    /// Fail sensors one at a time and record the change in error
    SimulateFailure(FailureArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Readings CSV: `timestamp,<sensor ids...>`
    #[arg(long, default_value = "data/metr-la/traffic.csv")]
    pub traffic_file: String,

    /// node2vec embedding: `V D` header, then `index v_1 .. v_D`
    #[arg(long, default_value = "data/metr-la/SE.txt")]
    pub se_file: String,

    /// Where the best model, config and metrics.csv are written
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, default_value = "results")]
    pub results_dir: String,

    /// Minutes per time step
    #[arg(long, default_value_t = 5)]
    pub time_slot: u32,

    /// History steps (P)
    #[arg(long, default_value_t = 12)]
    pub num_his: usize,

    /// Prediction steps (Q)
    #[arg(long, default_value_t = 12)]
    pub num_pred: usize,

    /// ST-attention blocks in each of the encoder and decoder (L)
    #[arg(long, default_value_t = 1)]
    pub num_blocks: usize,

    /// Attention heads (K)
    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    /// Dimension per head (d); the model width is K·d
    #[arg(long, default_value_t = 8)]
    pub head_dim: usize,

    #[arg(long, default_value_t = 0.7)]
    pub train_ratio: f64,

    #[arg(long, default_value_t = 0.1)]
    pub val_ratio: f64,

    #[arg(long, default_value_t = 0.2)]
    pub test_ratio: f64,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 1000)]
    pub max_epoch: usize,

    /// Epochs without a new best validation loss before stopping
    #[arg(long, default_value_t = 10)]
    pub patience: usize,

    #[arg(long, default_value_t = 0.001)]
    pub learning_rate: f64,

    /// Epochs between learning-rate and momentum decays
    #[arg(long, default_value_t = 5)]
    pub decay_epoch: usize,

    /// Seeds weight init and the shuffle order
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Build the projections without batch normalisation
    #[arg(long)]
    pub no_batch_norm: bool,

    /// Mask future steps in the encoder's temporal attention
    #[arg(long)]
    pub causal_encoder: bool,

    /// Mask future steps in the decoder's temporal attention
    #[arg(long)]
    pub causal_decoder: bool,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            traffic_file:   a.traffic_file,
            se_file:        a.se_file,
            checkpoint_dir: a.checkpoint_dir,
            results_dir:    a.results_dir,
            time_slot:      a.time_slot,
            num_his:        a.num_his,
            num_pred:       a.num_pred,
            num_blocks:     a.num_blocks,
            num_heads:      a.num_heads,
            head_dim:       a.head_dim,
            train_ratio:    a.train_ratio,
            val_ratio:      a.val_ratio,
            test_ratio:     a.test_ratio,
            batch_size:     a.batch_size,
            max_epoch:      a.max_epoch,
            patience:       a.patience,
            learning_rate:  a.learning_rate,
            decay_epoch:    a.decay_epoch,
            seed:           a.seed,
            batch_norm:     !a.no_batch_norm,
            causal_encoder: a.causal_encoder,
            causal_decoder: a.causal_decoder,
        }
    }
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Directory written by `train`
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, default_value = "results")]
    pub results_dir: String,
}

#[derive(Args, Debug)]
pub struct FailureArgs {
    /// Directory written by `train`
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, default_value = "results")]
    pub results_dir: String,

    /// Sensor ids to fail, comma separated; all sensors when omitted
    #[arg(long, value_delimiter = ',')]
    pub sensors: Vec<String>,
}
