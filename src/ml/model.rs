use burn::{prelude::*, tensor::Int};

use crate::ml::{
    attention::{AttentionConfig, TransformAttention},
    embedding::{StEmbedding, StEmbeddingConfig},
    error::ModelError,
    fc::{Fc, FcConfig},
    fusion::{StAttBlock, StAttBlockConfig},
    norm::NormCtx,
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct GmanConfig {
    pub num_his:       usize,
    pub num_pred:      usize,
    pub num_vertex:    usize,
    /// Time-of-day slots per day (T = 24·60 / time_slot)
    pub steps_per_day: usize,
    #[config(default = 1)]
    pub num_blocks:    usize,
    #[config(default = 8)]
    pub num_heads:     usize,
    #[config(default = 8)]
    pub head_dim:      usize,
    #[config(default = true)]
    pub batch_norm:     bool,
    #[config(default = false)]
    pub causal_encoder: bool,
    #[config(default = false)]
    pub causal_decoder: bool,
}

impl GmanConfig {
    /// D = K·d, also the required width of the spatial embedding.
    pub fn d_model(&self) -> usize {
        self.num_heads * self.head_dim
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        let dims = [
            ("num_his",       self.num_his),
            ("num_pred",      self.num_pred),
            ("num_vertex",    self.num_vertex),
            ("steps_per_day", self.steps_per_day),
            ("num_heads",     self.num_heads),
            ("head_dim",      self.head_dim),
        ];
        for (name, value) in dims {
            if value == 0 {
                return Err(ModelError::ZeroDimension { name });
            }
        }
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Gman<B>, ModelError> {
        self.validate()?;
        let d = self.d_model();

        let block = |causal: bool| {
            StAttBlockConfig::new(self.num_heads, self.head_dim)
                .with_batch_norm(self.batch_norm)
                .with_causal(causal)
                .init(device)
        };
        let encoder = (0..self.num_blocks)
            .map(|_| block(self.causal_encoder))
            .collect::<Result<Vec<_>, _>>()?;
        let decoder = (0..self.num_blocks)
            .map(|_| block(self.causal_decoder))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Gman {
            input: FcConfig::two_stage(1, d, d)
                .with_batch_norm(self.batch_norm)
                .init(device)?,
            embedding: StEmbeddingConfig::new(d, self.steps_per_day)
                .with_batch_norm(self.batch_norm)
                .init(device)?,
            encoder,
            transform: AttentionConfig::new(self.num_heads, self.head_dim)
                .with_batch_norm(self.batch_norm)
                .init_transform(device)?,
            decoder,
            output: FcConfig::two_stage(d, d, 1)
                .with_batch_norm(self.batch_norm)
                .init(device)?,
            num_his:    self.num_his,
            num_pred:   self.num_pred,
            num_vertex: self.num_vertex,
            d_model:    d,
        })
    }
}

#[derive(Module, Debug)]
pub struct Gman<B: Backend> {
    pub input:      Fc<B>,
    pub embedding:  StEmbedding<B>,
    pub encoder:    Vec<StAttBlock<B>>,
    pub transform:  TransformAttention<B>,
    pub decoder:    Vec<StAttBlock<B>>,
    pub output:     Fc<B>,
    pub num_his:    usize,
    pub num_pred:   usize,
    pub num_vertex: usize,
    pub d_model:    usize,
}

impl<B: Backend> Gman<B> {
    /// Checks every input shape, then runs [`Gman::forward`].
    ///
    /// x: [batch, num_his, V], te: [batch, num_his + num_pred, 2], se: [V, D]
    /// → [batch, num_pred, V]
    pub fn forecast(
        &self,
        x:   Tensor<B, 3>,
        te:  Tensor<B, 3, Int>,
        se:  Tensor<B, 2>,
        ctx: NormCtx,
    ) -> Result<Tensor<B, 3>, ModelError> {
        self.check_inputs(&x.dims(), &te.dims(), &se.dims())?;
        Ok(self.forward(x, te, se, ctx))
    }

    pub fn check_inputs(&self, x: &[usize; 3], te: &[usize; 3], se: &[usize; 2]) -> Result<(), ModelError> {
        if x[0] == 0 {
            return Err(ModelError::ZeroDimension { name: "batch" });
        }
        ModelError::check("history steps in X", self.num_his, x[1])?;
        ModelError::check("vertices in X", self.num_vertex, x[2])?;
        ModelError::check("batch size of TE", x[0], te[0])?;
        ModelError::check("steps in TE", self.num_his + self.num_pred, te[1])?;
        ModelError::check("width of TE", 2, te[2])?;
        ModelError::check("vertices in SE", self.num_vertex, se[0])?;
        ModelError::check("width of SE", self.d_model, se[1])?;
        Ok(())
    }

    /// Unchecked forward pass; see [`Gman::forecast`] for shapes.
    pub fn forward(
        &self,
        x:   Tensor<B, 3>,
        te:  Tensor<B, 3, Int>,
        se:  Tensor<B, 2>,
        ctx: NormCtx,
    ) -> Tensor<B, 3> {
        let [batch, num_his, vertices] = x.dims();
        let num_pred = self.num_pred;
        let d        = self.d_model;

        let mut x = self.input.forward(x.reshape([batch, num_his, vertices, 1]), ctx);

        let ste      = self.embedding.forward(se, te, ctx);
        let ste_his  = ste.clone().slice([0..batch, 0..num_his, 0..vertices, 0..d]);
        let ste_pred = ste.slice([0..batch, num_his..num_his + num_pred, 0..vertices, 0..d]);

        for block in &self.encoder {
            x = block.forward(x, ste_his.clone(), ctx);
        }
        x = self.transform.forward(x, ste_his, ste_pred.clone(), ctx);
        for block in &self.decoder {
            x = block.forward(x, ste_pred.clone(), ctx);
        }

        self.output
            .forward(x, ctx)
            .reshape([batch, num_pred, vertices])
    }
}

/// Zero-filled model inputs of the right shape.
pub struct Placeholder<B: Backend> {
    pub x:     Tensor<B, 3>,
    pub te:    Tensor<B, 3, Int>,
    pub label: Tensor<B, 3>,
}

pub fn placeholder<B: Backend>(
    batch:    usize,
    num_his:  usize,
    num_pred: usize,
    vertices: usize,
    device:   &B::Device,
) -> Placeholder<B> {
    Placeholder {
        x:     Tensor::zeros([batch, num_his, vertices], device),
        te:    Tensor::zeros([batch, num_his + num_pred, 2], device),
        label: Tensor::zeros([batch, num_pred, vertices], device),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::testing::{assert_all_close, normal, values, TestBackend};

    fn small() -> GmanConfig {
        GmanConfig::new(4, 3, 5, 24)
            .with_num_heads(2)
            .with_head_dim(3)
    }

    fn forecast_shape(cfg: &GmanConfig, batch: usize) -> [usize; 3] {
        let device = Default::default();
        let model  = cfg.init::<TestBackend>(&device).unwrap();
        let p = placeholder::<TestBackend>(batch, cfg.num_his, cfg.num_pred, cfg.num_vertex, &device);
        let se = normal::<2>([cfg.num_vertex, cfg.d_model()], &device);

        let y = model.forecast(p.x, p.te, se, NormCtx::inference()).unwrap();
        assert!(values(y.clone()).iter().all(|v| v.is_finite()));
        y.dims()
    }

    #[test]
    fn test_small_model_output_shape() {
        let cfg = small().with_num_blocks(2);
        assert_eq!(forecast_shape(&cfg, 3), [3, 3, 5]);
    }

    #[test]
    fn test_metr_la_sized_model_small_batch() {
        let cfg = GmanConfig::new(12, 12, 207, 288);
        assert_eq!(forecast_shape(&cfg, 2), [2, 12, 207]);
    }

    #[test]
    #[ignore = "allocates several GB on the CPU backend"]
    fn test_metr_la_sized_model_full_batch() {
        let cfg = GmanConfig::new(12, 12, 207, 288);
        assert_eq!(forecast_shape(&cfg, 32), [32, 12, 207]);
    }

    #[test]
    fn test_degenerate_sizes_run() {
        let cfg = GmanConfig::new(1, 1, 1, 288)
            .with_num_heads(1)
            .with_head_dim(1);
        assert_eq!(forecast_shape(&cfg, 1), [1, 1, 1]);
    }

    #[test]
    fn test_degenerate_model_tracks_its_single_input() {
        let device = Default::default();
        let cfg = GmanConfig::new(1, 1, 1, 288)
            .with_num_heads(1)
            .with_head_dim(1);
        let inputs = [-3.0f32, -1.0, 1.0, 3.0, 3.0];
        let se = Tensor::<TestBackend, 2>::from_floats([[0.5]], &device);
        let te = placeholder::<TestBackend>(inputs.len(), 1, 1, 1, &device).te;

        let mut responsive = 0;
        for seed in 0..16 {
            TestBackend::seed(seed);
            let model = cfg.init::<TestBackend>(&device).unwrap();
            let x = Tensor::<TestBackend, 1>::from_floats(inputs, &device).reshape([inputs.len(), 1, 1]);
            let y = values(model.forecast(x, te.clone(), se.clone(), NormCtx::inference()).unwrap());

            // same value, same TE → same forecast
            assert!((y[3] - y[4]).abs() < 1e-6, "seed {seed}: {y:?}");
            if y[..4].iter().any(|v| (v - y[0]).abs() > 1e-6) {
                responsive += 1;
            }
        }
        // ReLU stages can zero the path for an unlucky init, but not for every one
        assert!(responsive > 0);
    }

    #[test]
    fn test_inference_is_deterministic() {
        let device = Default::default();
        let model  = small().init::<TestBackend>(&device).unwrap();
        let x  = normal::<3>([2, 4, 5], &device);
        let se = normal::<2>([5, 6], &device);
        let te = placeholder::<TestBackend>(2, 4, 3, 5, &device).te;

        let a = model.forecast(x.clone(), te.clone(), se.clone(), NormCtx::inference()).unwrap();
        let b = model.forecast(x, te, se, NormCtx::inference()).unwrap();
        assert_all_close(a, b, 0.0);
    }

    #[test]
    fn test_training_mode_moves_running_stats() {
        let device = Default::default();
        let model  = small().init::<TestBackend>(&device).unwrap();
        let p  = placeholder::<TestBackend>(2, 4, 3, 5, &device);
        let se = normal::<2>([5, 6], &device);

        let running = |m: &Gman<TestBackend>| {
            let norm = m.embedding.spatial.stages[0].norm.as_ref().unwrap();
            values(norm.running_mean.value_sync())
        };

        let before = running(&model);
        let _ = model.forecast(p.x.clone(), p.te.clone(), se.clone(), NormCtx::inference()).unwrap();
        assert_eq!(running(&model), before);

        let _ = model.forecast(p.x, p.te, se, NormCtx::training(0.5)).unwrap();
        assert_ne!(running(&model), before);
    }

    #[test]
    fn test_without_batch_norm_has_no_norm_layers() {
        let model = small()
            .with_batch_norm(false)
            .init::<TestBackend>(&Default::default())
            .unwrap();
        assert!(model.input.stages.iter().all(|s| s.norm.is_none()));
    }

    #[test]
    fn test_causal_flags_reach_blocks() {
        let model = small()
            .with_causal_decoder(true)
            .init::<TestBackend>(&Default::default())
            .unwrap();
        assert!(!model.encoder[0].temporal.causal);
        assert!(model.decoder[0].temporal.causal);
    }

    #[test]
    fn test_shape_errors_are_reported_before_compute() {
        let device = Default::default();
        let model  = small().init::<TestBackend>(&device).unwrap();
        let p  = placeholder::<TestBackend>(2, 4, 3, 5, &device);
        let se = normal::<2>([5, 6], &device);

        let bad_se = model
            .forecast(p.x.clone(), p.te.clone(), normal::<2>([4, 6], &device), NormCtx::inference())
            .unwrap_err();
        assert_eq!(bad_se, ModelError::shape("vertices in SE", 5, 4));

        let bad_width = model
            .forecast(p.x.clone(), p.te.clone(), normal::<2>([5, 7], &device), NormCtx::inference())
            .unwrap_err();
        assert_eq!(bad_width, ModelError::shape("width of SE", 6, 7));

        let short_x = placeholder::<TestBackend>(2, 3, 3, 5, &device).x;
        let bad_x = model
            .forecast(short_x, p.te.clone(), se.clone(), NormCtx::inference())
            .unwrap_err();
        assert_eq!(bad_x, ModelError::shape("history steps in X", 4, 3));

        let short_te = placeholder::<TestBackend>(2, 4, 2, 5, &device).te;
        let bad_te = model
            .forecast(p.x, short_te, se, NormCtx::inference())
            .unwrap_err();
        assert_eq!(bad_te, ModelError::shape("steps in TE", 7, 6));
    }

    #[test]
    fn test_zero_dimension_config_is_rejected() {
        let err = GmanConfig::new(12, 0, 207, 288)
            .init::<TestBackend>(&Default::default())
            .unwrap_err();
        assert_eq!(err, ModelError::ZeroDimension { name: "num_pred" });
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let cfg  = small().with_causal_encoder(true);
        let json = serde_json::to_string(&cfg).unwrap();
        let back: GmanConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.d_model(), 6);
        assert!(back.causal_encoder);
    }
}
