// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validation loop using Burn's DataLoader and Adam.
//
//   - Training runs on an AutodiffBackend (Autodiff<Wgpu> in
//     production, Autodiff<NdArray> in tests)
//   - model.valid() gives the same model on the inner backend;
//     validation batches are built on that backend too
//   - The global optimiser step drives both the learning-rate
//     and the batch-norm momentum schedules
//   - Early stopping saves the best model whenever the
//     validation loss reaches a new minimum

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::time::Instant;

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{spatial_tensor, TrafficBatcher},
    pipeline::TrafficData,
};
use crate::domain::traffic::NULL_READING;
use crate::infra::{
    checkpoint::{BestEpoch, CheckpointManager},
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::{
    early_stopping::EarlyStopping,
    error::ModelError,
    loss::masked_mae_loss,
    model::{placeholder, Gman},
    norm::NormCtx,
    schedule::DecaySchedule,
};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOutcome {
    pub best:       Option<BestEpoch>,
    pub epochs_run:  usize,
    pub num_params:  usize,
    pub decay_steps: usize,
}

pub fn run_training(
    cfg:    &TrainConfig,
    data:   &TrafficData,
    ckpt:   &CheckpointManager,
    logger: &MetricsLogger,
) -> Result<TrainingOutcome> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop::<MyBackend>(cfg, data, ckpt, logger, &device)
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:    &TrainConfig,
    data:   &TrafficData,
    ckpt:   &CheckpointManager,
    logger: &MetricsLogger,
    device: &B::Device,
) -> Result<TrainingOutcome> {
    let num_vertex = data.num_vertex();

    // ── Build model ───────────────────────────────────────────────────────────
    B::seed(cfg.seed);
    let model_cfg = cfg.model_config(num_vertex, data.steps_per_day);
    let mut model: Gman<B> = model_cfg.init(device)?;
    let num_params = model.num_params();
    tracing::info!(
        "Model ready: {} blocks, {} heads × {} dims, {} trainable parameters",
        model_cfg.num_blocks, model_cfg.num_heads, model_cfg.head_dim, num_params,
    );

    let se_train = spatial_tensor::<B>(&data.se, device);
    let se_valid = spatial_tensor::<B::InnerBackend>(&data.se, device);

    // ── Zero-input forward pass: fail on shape errors before epoch 1 ─────────
    let dry = placeholder::<B::InnerBackend>(1, cfg.num_his, cfg.num_pred, num_vertex, device);
    let out = model.valid().forecast(dry.x, dry.te, se_valid.clone(), NormCtx::inference())?;
    ModelError::check("forecast shape", dry.label.dims()[1] * dry.label.dims()[2], out.dims()[1] * out.dims()[2])?;

    // ── Adam optimiser + decay schedules ──────────────────────────────────────
    let mut optim  = AdamConfig::new().with_epsilon(1e-8).init();
    let schedule   = DecaySchedule::new(cfg.learning_rate, cfg.decay_epoch, data.train.samples().len(), cfg.batch_size);
    tracing::info!("Decay every {} steps", schedule.decay_steps);

    // ── Data loaders ──────────────────────────────────────────────────────────
    let train_loader = DataLoaderBuilder::new(TrafficBatcher::<B>::new(device.clone(), num_vertex))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(data.train.clone());

    let val_loader = DataLoaderBuilder::new(TrafficBatcher::<B::InnerBackend>::new(device.clone(), num_vertex))
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(data.val.clone());

    logger.reset()?;
    let mut stopper    = EarlyStopping::new(cfg.patience);
    let mut step       = 0usize;
    let mut epochs_run = 0usize;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.max_epoch {
        if stopper.should_stop() {
            tracing::info!("Early stop at epoch {}", epoch);
            break;
        }
        let started = Instant::now();

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_seen     = 0usize;

        for batch in train_loader.iter() {
            let n   = batch.x.dims()[0];
            let ctx = NormCtx::training(schedule.bn_momentum(step));

            let pred = model.forecast(batch.x, batch.te, se_train.clone(), ctx)?;
            let loss = masked_mae_loss(pred, batch.y, &data.scaler, NULL_READING);

            train_loss_sum += loss.clone().into_scalar().elem::<f64>() * n as f64;
            train_seen     += n;

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(schedule.learning_rate(step), model, grads);
            step += 1;
        }
        let train_loss = train_loss_sum / train_seen.max(1) as f64;

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();

        let mut val_loss_sum = 0.0f64;
        let mut val_seen     = 0usize;

        for batch in val_loader.iter() {
            let n    = batch.x.dims()[0];
            let pred = model_valid.forecast(batch.x, batch.te, se_valid.clone(), NormCtx::inference())?;
            let loss = masked_mae_loss(pred, batch.y, &data.scaler, NULL_READING);

            val_loss_sum += loss.into_scalar().elem::<f64>() * n as f64;
            val_seen     += n;
        }
        let val_loss = val_loss_sum / val_seen.max(1) as f64;

        let metrics = EpochMetrics {
            epoch,
            train_loss,
            val_loss,
            learning_rate: schedule.learning_rate(step),
            bn_momentum:   schedule.bn_momentum(step),
            seconds:       started.elapsed().as_secs_f64(),
        };
        println!(
            "Epoch {:>4}/{} | train_loss={:.4} | val_loss={:.4} | lr={:.2e} | {:.1}s",
            epoch, cfg.max_epoch, train_loss, val_loss, metrics.learning_rate, metrics.seconds,
        );
        logger.log(&metrics)?;
        epochs_run = epoch;

        stopper.observe(epoch, val_loss, || {
            ckpt.save_best(&model_valid, BestEpoch { epoch, val_loss })
        })?;
    }

    let best = stopper
        .best_epoch
        .map(|epoch| BestEpoch { epoch, val_loss: stopper.best });
    tracing::info!("Training complete after {} epochs (best: {:?})", epochs_run, best);

    Ok(TrainingOutcome { best, epochs_run, num_params, decay_steps: schedule.decay_steps })
}
