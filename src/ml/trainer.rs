// ============================================================
// Layer 5 — Adversarial Training Loop
// ============================================================
// One optimisation step:
//
//   s_feats = E(style)          c4 = E(content).relu4_1
//   t       = AdaIN(c4, s_feats.relu4_1)
//   g       = Dec(t)
//
//   D step:  L_D = ½ [BCE(D(style), 1) + BCE(D(g.detach()), 0)]
//   G step:  L_G = w_c·‖E(g)₄ − t‖² + w_s·Σ style(E(g)_i, s_i)
//                + w_adv·BCE(D(g), 1) + w_tv·TV(g)
//
// Only the decoder is optimised by L_G; only the discriminator by
// L_D. The encoder is frozen. Both learning rates decay as
// lr / (1 + decay · step).
//
// Per epoch: validation on the inner backend (no autodiff), one
// metrics row, one checkpoint.

use anyhow::{bail, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder, DataLoaderIterator},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use std::{path::PathBuf, sync::Arc, time::Instant};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{ImageBatch, ImageBatcher},
    dataset::ImageDataset,
};
use crate::domain::style::StyleLossKind;
use crate::infra::{
    checkpoint::{CheckpointManager, TrainingState},
    metrics::{EpochMetrics, LossAccumulator, MetricsLogger, StepLosses},
    samples::save_grid,
};
use crate::ml::{
    adain::adaptive_instance_norm,
    decoder::{Decoder, DecoderConfig},
    discriminator::{Discriminator, DiscriminatorConfig},
    encoder::{EncoderFeatures, VggEncoder, VggEncoderConfig},
    loss::{content_loss, discriminator_loss, generator_adv_loss, style_loss, total_variation},
};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Datasets for one run. Style images are used twice: randomly
/// cropped for training, centre cropped for validation.
pub struct TrainData {
    pub content_train: ImageDataset,
    pub content_val:   ImageDataset,
    pub style_train:   ImageDataset,
    pub style_val:     ImageDataset,
}

/// What a finished (or already complete) run reports back.
#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub state: TrainingState,
    pub epochs_run: usize,
    pub last_metrics: Option<EpochMetrics>,
}

/// `base / (1 + decay · step)`
pub fn decayed_lr(base: f64, decay: f64, step: usize) -> f64 {
    base / (1.0 + decay * step as f64)
}

pub fn run_training(cfg: &TrainConfig, data: TrainData, ckpt: &CheckpointManager) -> Result<TrainSummary> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop::<MyBackend>(cfg, data, ckpt, device)
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:    &TrainConfig,
    data:   TrainData,
    ckpt:   &CheckpointManager,
    device: B::Device,
) -> Result<TrainSummary> {
    if data.content_train.is_empty() || data.style_train.is_empty() {
        bail!("training needs at least one content and one style image");
    }
    tracing::info!(
        "Training on {} content and {} style images ({} held out for validation)",
        data.content_train.records().len(),
        data.style_train.records().len(),
        data.content_val.records().len(),
    );
    B::seed(cfg.seed);

    // ── Resume point ──────────────────────────────────────────────────────────
    let saved = if cfg.resume { ckpt.latest_state()? } else { None };
    if let Some(state) = saved.filter(|s| s.epoch >= cfg.epochs) {
        tracing::info!("Checkpoint already covers {} epochs; nothing to do", state.epoch);
        return Ok(TrainSummary { state, epochs_run: 0, last_metrics: None });
    }
    if !cfg.resume {
        ckpt.clear_history()?;
    }

    // ── Build models ──────────────────────────────────────────────────────────
    let encoder = prepare_encoder::<B>(cfg, ckpt, saved.is_some(), &device)?;

    let decoder = DecoderConfig::new()
        .with_base_channels(cfg.base_channels)
        .init::<B>(&device);
    let discriminator = DiscriminatorConfig::new()
        .with_base_channels(cfg.disc_base_channels)
        .with_num_layers(cfg.disc_layers)
        .init::<B>(&device);
    tracing::info!(
        "Models ready: decoder {} params, discriminator {} params",
        decoder.num_params(),
        discriminator.num_params()
    );

    let optim_decoder = AdamConfig::new().init::<B, Decoder<B>>();
    let optim_disc = AdamConfig::new()
        .with_beta_1(0.5)
        .init::<B, Discriminator<B>>();

    let (mut decoder, mut discriminator, mut optim_decoder, mut optim_disc, mut state) = if saved.is_some() {
        let r = ckpt.load_training(decoder, discriminator, optim_decoder, optim_disc, &device)?;
        (r.decoder, r.discriminator, r.optim_decoder, r.optim_disc, r.state.unwrap_or_default())
    } else {
        (decoder, discriminator, optim_decoder, optim_disc, TrainingState::default())
    };

    // ── Data loaders ──────────────────────────────────────────────────────────
    let content_loader = build_loader::<B>(data.content_train, cfg, Some(cfg.seed), &device);
    let style_loader   = build_loader::<B>(data.style_train, cfg, Some(cfg.seed.wrapping_add(1)), &device);
    let val_content_loader = build_loader::<B::InnerBackend>(data.content_val, cfg, None, &device);
    let val_style_loader   = build_loader::<B::InnerBackend>(data.style_val, cfg, None, &device);

    let metrics = if saved.is_some() {
        MetricsLogger::new(ckpt.dir())?
    } else {
        MetricsLogger::create(ckpt.dir())?
    };
    tracing::info!("Logging epoch metrics to '{}'", metrics.csv_path().display());

    let sample_dir = ckpt.dir().join("samples");
    let objective  = Objective::from(cfg);
    let start_time = Instant::now();
    let mut epochs_run   = 0usize;
    let mut last_metrics = None;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in state.epoch..cfg.epochs {
        let mut acc = LossAccumulator::default();
        let mut style_iter = style_loader.iter();

        // Batches whose every image failed to decode come through as None
        for batch in content_loader.iter().flatten() {
            let Some(style_batch) = next_cycled(&*style_loader, &mut style_iter) else {
                bail!("style loader produced no readable batches");
            };
            state.step += 1;

            let lr      = decayed_lr(cfg.lr, cfg.lr_decay, state.step);
            let disc_lr = decayed_lr(cfg.disc_lr, cfg.lr_decay, state.step);
            let (content, style) = align_batches(batch.images, style_batch.images);

            // ── Forward ───────────────────────────────────────────────────────
            let style_feats = encoder.forward(style.clone());
            let target   = adaptive_instance_norm(encoder.encode(content.clone()), style_feats.relu4_1.clone());
            let stylized = decoder.forward(target.clone());

            // ── Discriminator step ────────────────────────────────────────────
            let (updated, d_loss) = discriminator_step(
                discriminator,
                &mut optim_disc,
                style.clone(),
                stylized.clone(),
                disc_lr,
            );
            discriminator = updated;

            // ── Generator (decoder) step ──────────────────────────────────────
            let (updated, mut losses) = decoder_step(
                &encoder,
                decoder,
                &discriminator,
                &mut optim_decoder,
                DecoderInputs { stylized: stylized.clone(), target, style_feats: &style_feats },
                &objective,
                lr,
            );
            decoder = updated;
            losses.d_loss = d_loss;

            acc.add(losses);
            tracing::debug!(
                "step {} lr={:.2e} d_loss={:.4} g_loss={:.4}",
                state.step, lr, losses.d_loss, losses.g_loss
            );

            if cfg.sample_every > 0 && state.step % cfg.sample_every == 0 {
                let path = sample_dir.join(format!("step_{:06}.png", state.step));
                save_grid(content, style, stylized, &path)?;
                tracing::info!(
                    "[{:.0}s] step {}: d_loss={:.4} g_loss={:.4} content={:.4} style={:.4}",
                    start_time.elapsed().as_secs_f32(),
                    state.step, losses.d_loss, losses.g_loss, losses.content_loss, losses.style_loss
                );
            }

            if cfg.checkpoint_every > 0 && state.step % cfg.checkpoint_every == 0 {
                let mid = TrainingState { epoch, step: state.step };
                ckpt.save_training(&decoder, &discriminator, &optim_decoder, &optim_disc, mid)?;
                tracing::info!("Checkpoint saved at step {}", state.step);
            }
        }

        // ── Validation phase ──────────────────────────────────────────────────
        // valid() drops autodiff: inner-backend modules, no graph
        let (val_content, val_style) = validate(
            &encoder.valid(),
            &decoder.valid(),
            &*val_content_loader,
            &*val_style_loader,
            cfg.style_loss,
            Some(sample_dir.join(format!("val_epoch_{:03}.png", epoch + 1))),
        )?;

        state.epoch = epoch + 1;
        ckpt.save_training(&decoder, &discriminator, &optim_decoder, &optim_disc, state)?;
        ckpt.save_decoder_epoch(&decoder, state.epoch)?;

        let train = acc.mean();
        let m = EpochMetrics {
            epoch: state.epoch,
            step:  state.step,
            train,
            val_content_loss: val_content,
            val_style_loss:   val_style,
        };
        metrics.log(&m)?;

        println!(
            "Epoch {:>3}/{} | step {:>6} | d_loss={:.4} | g_loss={:.4} | content={:.4} | style={:.4} | val_content={:.4} | val_style={:.4}",
            state.epoch, cfg.epochs, state.step,
            train.d_loss, train.g_loss, train.content_loss, train.style_loss,
            val_content, val_style,
        );
        tracing::info!("Checkpoint saved for epoch {}", state.epoch);

        epochs_run  += 1;
        last_metrics = Some(m);
    }

    tracing::info!("Training complete!");
    Ok(TrainSummary { state, epochs_run, last_metrics })
}

/// Encoder for this run. A resumed run reuses the snapshot it was trained
/// against; a fresh run loads `encoder_weights` (or starts random) and
/// writes a new snapshot.
fn prepare_encoder<B: Backend>(
    cfg:      &TrainConfig,
    ckpt:     &CheckpointManager,
    resuming: bool,
    device:   &B::Device,
) -> Result<VggEncoder<B>> {
    let encoder = VggEncoderConfig::new()
        .with_base_channels(cfg.base_channels)
        .init::<B>(device);

    if resuming && ckpt.has_encoder() {
        if cfg.encoder_weights.is_some() {
            tracing::warn!("Resuming: ignoring --encoder-weights and using the encoder snapshot");
        }
        return Ok(ckpt.load_encoder(encoder, device)?.no_grad());
    }

    let encoder = match &cfg.encoder_weights {
        Some(path) => {
            tracing::info!("Loading pretrained encoder weights from '{}'", path);
            encoder.load_pretrained(path.as_ref(), device)?
        }
        None => {
            tracing::warn!("No pretrained encoder weights given; using a randomly initialised VGG encoder");
            encoder
        }
    };
    ckpt.save_encoder(&encoder)?;
    Ok(encoder.no_grad())
}

fn build_loader<B: Backend>(
    dataset: ImageDataset,
    cfg:     &TrainConfig,
    shuffle: Option<u64>,
    device:  &B::Device,
) -> Arc<dyn DataLoader<Option<ImageBatch<B>>>> {
    let builder = DataLoaderBuilder::new(ImageBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .num_workers(cfg.num_workers.max(1));
    match shuffle {
        Some(seed) => builder.shuffle(seed).build(dataset),
        None => builder.build(dataset),
    }
}

/// Next readable batch, restarting the loader once it runs dry.
fn next_cycled<'a, O>(
    loader: &'a dyn DataLoader<Option<O>>,
    iter:   &mut Box<dyn DataLoaderIterator<Option<O>> + 'a>,
) -> Option<O> {
    if let Some(batch) = iter.by_ref().flatten().next() {
        return Some(batch);
    }
    *iter = loader.iter();
    iter.by_ref().flatten().next()
}

/// Trim both batches to the smaller batch size.
pub fn align_batches<B: Backend>(content: Tensor<B, 4>, style: Tensor<B, 4>) -> (Tensor<B, 4>, Tensor<B, 4>) {
    let n = content.dims()[0].min(style.dims()[0]);
    (content.narrow(0, 0, n), style.narrow(0, 0, n))
}

fn scalar<B: Backend>(t: Tensor<B, 1>) -> f64 {
    t.into_scalar().elem::<f64>()
}

/// Loss weights plus the style statistic compared.
#[derive(Debug, Clone, Copy)]
struct Objective {
    content: f64,
    style:   f64,
    adv:     f64,
    tv:      f64,
    kind:    StyleLossKind,
}

impl From<&TrainConfig> for Objective {
    fn from(cfg: &TrainConfig) -> Self {
        Self {
            content: cfg.content_weight,
            style:   cfg.style_weight,
            adv:     cfg.adv_weight,
            tv:      cfg.tv_weight,
            kind:    cfg.style_loss,
        }
    }
}

/// Decoder output together with what it is measured against.
struct DecoderInputs<'a, B: Backend> {
    stylized:    Tensor<B, 4>,
    /// AdaIN target the decoder was fed
    target:      Tensor<B, 4>,
    style_feats: &'a EncoderFeatures<B>,
}

struct GeneratorLosses<B: Backend> {
    total:   Tensor<B, 1>,
    content: Tensor<B, 1>,
    style:   Tensor<B, 1>,
    adv:     Option<Tensor<B, 1>>,
}

/// Weighted decoder objective. The adversarial term is skipped when no
/// discriminator is given (validation) or its weight is zero.
fn generator_objective<B: Backend>(
    encoder:       &VggEncoder<B>,
    discriminator: Option<&Discriminator<B>>,
    inputs:        DecoderInputs<'_, B>,
    obj:           &Objective,
) -> GeneratorLosses<B> {
    let DecoderInputs { stylized, target, style_feats } = inputs;

    let gen_feats = encoder.forward(stylized.clone());
    let content = content_loss(gen_feats.relu4_1.clone(), target);
    let style   = style_loss(&gen_feats.layers(), &style_feats.layers(), obj.kind);

    let mut total = content.clone().mul_scalar(obj.content) + style.clone().mul_scalar(obj.style);

    let adv = match discriminator {
        Some(d) if obj.adv > 0.0 => {
            let adv = generator_adv_loss(d.forward(stylized.clone()));
            total = total + adv.clone().mul_scalar(obj.adv);
            Some(adv)
        }
        _ => None,
    };
    if obj.tv > 0.0 {
        total = total + total_variation(stylized).mul_scalar(obj.tv);
    }

    GeneratorLosses { total, content, style, adv }
}

/// One discriminator update on real style images against detached
/// decoder output. Returns the updated critic and its loss.
fn discriminator_step<B, O>(
    discriminator: Discriminator<B>,
    optim:         &mut O,
    real:          Tensor<B, 4>,
    fake:          Tensor<B, 4>,
    lr:            f64,
) -> (Discriminator<B>, f64)
where
    B: AutodiffBackend,
    O: Optimizer<Discriminator<B>, B>,
{
    let loss = discriminator_loss(discriminator.forward(real), discriminator.forward(fake.detach()));
    let value = scalar(loss.clone());
    let grads = GradientsParams::from_grads(loss.backward(), &discriminator);
    (optim.step(lr, discriminator, grads), value)
}

/// One decoder update. Gradients are taken for the decoder's parameters
/// only; encoder and discriminator are read, never stepped.
/// `d_loss` in the returned losses is left at zero.
fn decoder_step<B, O>(
    encoder:       &VggEncoder<B>,
    decoder:       Decoder<B>,
    discriminator: &Discriminator<B>,
    optim:         &mut O,
    inputs:        DecoderInputs<'_, B>,
    obj:           &Objective,
    lr:            f64,
) -> (Decoder<B>, StepLosses)
where
    B: AutodiffBackend,
    O: Optimizer<Decoder<B>, B>,
{
    let g = generator_objective(encoder, Some(discriminator), inputs, obj);
    let losses = StepLosses {
        d_loss:       0.0,
        g_loss:       scalar(g.total.clone()),
        content_loss: scalar(g.content),
        style_loss:   scalar(g.style),
        adv_loss:     g.adv.map(scalar).unwrap_or(0.0),
    };
    let grads = GradientsParams::from_grads(g.total.backward(), &decoder);
    (optim.step(lr, decoder, grads), losses)
}

/// Mean content and style loss over the validation set; NaN for both
/// when it is empty. Writes a preview of the first batch to `sample`.
fn validate<B: Backend>(
    encoder:        &VggEncoder<B>,
    decoder:        &Decoder<B>,
    content_loader: &dyn DataLoader<Option<ImageBatch<B>>>,
    style_loader:   &dyn DataLoader<Option<ImageBatch<B>>>,
    kind:           StyleLossKind,
    sample:         Option<PathBuf>,
) -> Result<(f64, f64)> {
    let obj = Objective { content: 1.0, style: 1.0, adv: 0.0, tv: 0.0, kind };
    let mut content_sum = 0.0f64;
    let mut style_sum   = 0.0f64;
    let mut batches     = 0usize;
    let mut sample      = sample;

    let mut style_iter = style_loader.iter();
    for batch in content_loader.iter().flatten() {
        let Some(style_batch) = next_cycled(style_loader, &mut style_iter) else {
            break;
        };
        let (content, style) = align_batches(batch.images, style_batch.images);

        let style_feats = encoder.forward(style.clone());
        let target   = adaptive_instance_norm(encoder.encode(content.clone()), style_feats.relu4_1.clone());
        let stylized = decoder.forward(target.clone());

        let inputs = DecoderInputs { stylized: stylized.clone(), target, style_feats: &style_feats };
        let g = generator_objective(encoder, None, inputs, &obj);
        content_sum += scalar(g.content);
        style_sum   += scalar(g.style);
        batches     += 1;

        if let Some(path) = sample.take() {
            save_grid(content, style, stylized, &path)?;
        }
    }

    if batches == 0 {
        return Ok((f64::NAN, f64::NAN));
    }
    Ok((content_sum / batches as f64, style_sum / batches as f64))
}
