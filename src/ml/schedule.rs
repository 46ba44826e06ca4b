// ============================================================
// Layer 5 — Staircase Decay Schedules
// ============================================================
// Both schedules step down every `decay_steps` optimiser steps:
//
//   stage = ⌊step / decay_steps⌋
//   lr    = max(lr₀ · 0.7^stage, 1e-5)
//   m     = max(0.5 · 0.5^stage, 0.01)     batch-norm momentum
//
// decay_steps = decay_epoch · num_train / batch_size, at least 1.

pub const LR_DECAY_RATE: f64 = 0.7;
pub const LR_FLOOR:      f64 = 1e-5;
pub const BN_MOMENTUM_0: f64 = 0.5;
pub const BN_DECAY_RATE: f64 = 0.5;
pub const BN_FLOOR:      f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecaySchedule {
    pub initial_lr:  f64,
    pub decay_steps: usize,
}

impl DecaySchedule {
    pub fn new(initial_lr: f64, decay_epoch: usize, num_train: usize, batch_size: usize) -> Self {
        let decay_steps = (decay_epoch * num_train / batch_size.max(1)).max(1);
        Self { initial_lr, decay_steps }
    }

    fn stage(&self, step: usize) -> i32 {
        (step / self.decay_steps).min(i32::MAX as usize) as i32
    }

    pub fn learning_rate(&self, step: usize) -> f64 {
        (self.initial_lr * LR_DECAY_RATE.powi(self.stage(step))).max(LR_FLOOR)
    }

    pub fn bn_momentum(&self, step: usize) -> f64 {
        (BN_MOMENTUM_0 * BN_DECAY_RATE.powi(self.stage(step))).max(BN_FLOOR)
    }
}
