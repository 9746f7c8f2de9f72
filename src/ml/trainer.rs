// ============================================================
// Layer 5 - Training Loop
// ============================================================
// Step-based training with periodic validation and a plateau-driven
// learning rate (see ml::plateau):
//
//   while schedule.should_continue(val_curve):
//       for batch in train_loader:            ← one epoch
//           forward → loss → backward → AdamW step
//           every eval_interval steps:
//               train_curve += mean(recent train losses)
//               val_curve   += mean(validation loss)
//       schedule.adjust(val_curve)            ← maybe lr /= 1.5
//       save checkpoint
//
// The global step counter keeps running across epochs so evaluation
// points are evenly spaced over the whole run.
//
// Key Burn insight:
//   - Training uses B (Autodiff<...>) for gradients
//   - model.valid() returns the model on B::InnerBackend
//   - the validation loader therefore batches on B::InnerBackend
//
// Reference: Burn Book §5, Loshchilov & Hutter (2019) AdamW

use std::time::Instant;

use anyhow::{bail, Result};
use burn::{
    module::AutodiffModule,
    optim::{AdamWConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::{BatchLoader, TrainLoader, ValidLoader};
use crate::infra::{
    checkpoint::{CheckpointManager, TrainState},
    metrics::{EvalPoint, LossCurveLogger},
};
use crate::ml::{
    model::{GptConfig, GptModel},
    plateau::{PlateauConfig, PlateauSchedule},
};

/// Settings the loop itself needs; built from TrainConfig.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub model:         GptConfig,
    pub lr:            f64,
    pub weight_decay:  f64,
    pub eval_interval: usize,
    pub plateau:       PlateauConfig,
    /// Hard cap on epochs in addition to the plateau rule
    pub max_epochs:    Option<usize>,
    pub seed:          u64,
    pub resume:        bool,
}

/// What a finished run looked like.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub steps:       usize,
    pub epochs:      usize,
    pub final_lr:    f64,
    pub train_curve: Vec<f64>,
    pub val_curve:   Vec<f64>,
}

/// Mean loss over the whole validation loader on the no-autodiff model.
pub fn evaluate<B: Backend>(model: &GptModel<B>, val_loader: &BatchLoader<B>) -> f64 {
    let mut sum     = 0.0f64;
    let mut batches = 0usize;

    for batch in val_loader.iter() {
        let (loss, _) = model.forward_loss(batch.inputs, batch.targets);
        sum     += loss.into_scalar().elem::<f64>();
        batches += 1;
    }

    if batches > 0 { sum / batches as f64 } else { f64::NAN }
}

pub fn run_training<B: AutodiffBackend>(
    settings:     &LoopSettings,
    train_loader: TrainLoader<B>,
    val_loader:   ValidLoader<B>,
    ckpt:         &CheckpointManager,
    device:       &B::Device,
) -> Result<TrainReport> {
    if settings.eval_interval == 0 {
        bail!("eval_interval must be positive");
    }
    if val_loader.num_items() == 0 {
        bail!("validation set is empty");
    }

    B::seed(settings.seed);

    // ── Build or restore model, optimizer and progress ───────────────────────
    let mut model: GptModel<B> = settings.model.init(device);
    let mut optim = AdamWConfig::new()
        .with_weight_decay(settings.weight_decay as f32)
        .init::<B, GptModel<B>>();

    let mut state = TrainState { lr: settings.lr, step: 0, epoch: 0 };

    if settings.resume {
        model = ckpt.load_model(model, device)?;
        optim = ckpt.load_optimizer(optim, device)?;
        state = ckpt.load_state()?;
        tracing::info!(
            "Resumed from step {} (epoch {}), lr={:.4e}",
            state.step, state.epoch, state.lr
        );
    }

    tracing::info!("The model has {:.4}M parameters", model.num_params() as f64 / 1e6);

    let logger       = LossCurveLogger::new(ckpt.dir(), settings.resume)?;
    tracing::info!("Logging the loss curve to '{}'", logger.csv_path().display());
    let mut schedule = PlateauSchedule::new(settings.plateau, state.lr);

    let mut train_curve: Vec<f64> = Vec::new();
    let mut val_curve:   Vec<f64> = Vec::new();
    let mut step        = state.step;
    let mut epoch       = state.epoch;
    let mut epochs_run  = 0usize;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    while schedule.should_continue(&val_curve) {
        if settings.max_epochs.is_some_and(|max| epochs_run >= max) {
            tracing::info!("Reached the epoch limit of {}", epochs_run);
            break;
        }

        let t0 = Instant::now();
        let mut recent: Vec<f64> = Vec::new();

        for batch in train_loader.iter() {
            step += 1;

            let (loss, _) = model.forward_loss(batch.inputs, batch.targets);
            recent.push(loss.clone().into_scalar().elem::<f64>());

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(schedule.lr(), model, grads);

            if step % settings.eval_interval == 0 {
                let train_loss = recent.iter().sum::<f64>() / recent.len().max(1) as f64;
                let val_loss   = evaluate(&model.valid(), &val_loader);
                recent.clear();

                train_curve.push(train_loss);
                val_curve.push(val_loss);
                logger.log(&EvalPoint { step, epoch, train_loss, val_loss, lr: schedule.lr() })?;
            }
        }

        let dt = t0.elapsed().as_secs_f64();
        tracing::info!("Epoch {}: {:.2}s ({:.2}min)", epoch, dt, dt / 60.0);
        match val_curve.last() {
            Some(loss) => tracing::info!("Trained on {} batches in total. Loss is {:.5}", step, loss),
            None       => tracing::info!("Trained on {} batches in total. No evaluation yet", step),
        }

        epoch      += 1;
        epochs_run += 1;

        if train_curve.len() > 1 {
            if let Some(adj) = schedule.adjust(&val_curve) {
                tracing::info!(
                    "Loss has reduced by {:.4}% over the past {} evaluations",
                    adj.improvement_pct(),
                    adj.lookback - 1,
                );
                if adj.reduced {
                    tracing::info!("Reducing learning rate to {:.4e}", adj.lr);
                } else {
                    tracing::info!("Learning rate kept at {:.4e}", adj.lr);
                }
            }
        }

        save_checkpoint(ckpt, &model, &optim, &TrainState { lr: schedule.lr(), step, epoch })?;
    }

    save_checkpoint(ckpt, &model, &optim, &TrainState { lr: schedule.lr(), step, epoch })?;
    tracing::info!("Model checkpoint saved to '{}'", ckpt.dir().display());

    Ok(TrainReport {
        steps:    step,
        epochs:   epoch,
        final_lr: schedule.lr(),
        train_curve,
        val_curve,
    })
}

fn save_checkpoint<B, O>(
    ckpt:  &CheckpointManager,
    model: &GptModel<B>,
    optim: &O,
    state: &TrainState,
) -> Result<()>
where
    B: AutodiffBackend,
    O: Optimizer<GptModel<B>, B>,
{
    ckpt.save_model(model)?;
    ckpt.save_optimizer::<B, O>(optim)?;
    ckpt.save_state(state)?;
    Ok(())
}
