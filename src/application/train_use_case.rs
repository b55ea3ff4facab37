// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate hyper-parameters
//   Step 2: Scan content images         (Layer 4 - data)
//   Step 3: Scan style images           (Layer 4 - data)
//   Step 4: Split content train/val     (Layer 4 - data)
//   Step 5: Build datasets              (Layer 4 - data)
//   Step 6: Save config                 (Layer 6 - infra)
//   Step 7: Run training loop           (Layer 5 - ml)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::ImageDataset,
    loader::ImageFolderLoader,
    preprocessor::{ImagePreprocessor, SIZE_MULTIPLE},
    splitter::split_train_val,
};
use crate::domain::{style::StyleLossKind, traits::ImageSource};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::trainer::{run_training, TrainData, TrainSummary};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run. Saved next to the
// checkpoints so `stylize` can rebuild the same architecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub content_dir:        String,
    pub style_dir:          String,
    pub checkpoint_dir:     String,
    /// Pretrained VGG record; random initialisation when absent.
    pub encoder_weights:    Option<String>,
    pub load_size:          u32,
    pub crop_size:          u32,
    pub batch_size:         usize,
    pub epochs:             usize,
    pub lr:                 f64,
    pub lr_decay:           f64,
    pub disc_lr:            f64,
    pub content_weight:     f64,
    pub style_weight:       f64,
    pub adv_weight:         f64,
    pub tv_weight:          f64,
    pub style_loss:         StyleLossKind,
    pub base_channels:      usize,
    pub disc_base_channels: usize,
    pub disc_layers:        usize,
    pub val_fraction:       f64,
    pub sample_every:       usize,
    pub checkpoint_every:   usize,
    pub num_workers:        usize,
    pub seed:               u64,
    pub resume:             bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            content_dir:        "data/content".to_string(),
            style_dir:          "data/style".to_string(),
            checkpoint_dir:     "checkpoints".to_string(),
            encoder_weights:    None,
            load_size:          512,
            crop_size:          256,
            batch_size:         8,
            epochs:             10,
            lr:                 1e-4,
            lr_decay:           5e-5,
            disc_lr:            1e-4,
            content_weight:     1.0,
            style_weight:       10.0,
            adv_weight:         0.1,
            tv_weight:          0.0,
            style_loss:         StyleLossKind::Gram,
            base_channels:      64,
            disc_base_channels: 64,
            disc_layers:        3,
            val_fraction:       0.05,
            sample_every:       500,
            checkpoint_every:   1000,
            num_workers:        2,
            seed:               42,
            resume:             true,
        }
    }
}

impl TrainConfig {
    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if self.epochs == 0 {
            bail!("epochs must be at least 1");
        }
        if self.crop_size > self.load_size {
            bail!(
                "crop_size ({}) cannot exceed load_size ({})",
                self.crop_size,
                self.load_size
            );
        }
        if self.crop_size == 0 || self.crop_size % SIZE_MULTIPLE != 0 {
            bail!("crop_size ({}) must be a positive multiple of {}", self.crop_size, SIZE_MULTIPLE);
        }
        if !(0.0..1.0).contains(&self.val_fraction) {
            bail!("val_fraction ({}) must be in [0, 1)", self.val_fraction);
        }
        if self.base_channels == 0 || self.disc_base_channels == 0 || self.disc_layers == 0 {
            bail!("channel counts and discriminator depth must be non-zero");
        }
        let weights = [
            self.lr,
            self.lr_decay,
            self.disc_lr,
            self.content_weight,
            self.style_weight,
            self.adv_weight,
            self.tv_weight,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            bail!("learning rates and loss weights must be finite and non-negative");
        }
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;

        // ── Step 1: Validate ──────────────────────────────────────────────────
        cfg.validate()?;

        let (data, ckpt_manager) = self.prepare()?;

        // ── Step 7: Run training loop (Layer 5) ───────────────────────────────
        run_training(cfg, data, &ckpt_manager)
    }

    /// Steps 2–6: everything up to the training loop.
    fn prepare(&self) -> Result<(TrainData, CheckpointManager)> {
        let cfg = &self.config;

        // ── Step 2: Scan content photographs ──────────────────────────────────
        tracing::info!("Scanning content images in '{}'", cfg.content_dir);
        let content = ImageFolderLoader::new(&cfg.content_dir).load_all()?;
        if content.is_empty() {
            bail!("No usable content images found in '{}'", cfg.content_dir);
        }

        // ── Step 3: Scan style images ─────────────────────────────────────────
        tracing::info!("Scanning style images in '{}'", cfg.style_dir);
        let style = ImageFolderLoader::new(&cfg.style_dir).load_all()?;
        if style.is_empty() {
            bail!("No usable style images found in '{}'", cfg.style_dir);
        }
        tracing::info!("Found {} content and {} style images", content.len(), style.len());

        let small = content
            .iter()
            .chain(&style)
            .filter(|r| r.width.min(r.height) < cfg.load_size)
            .count();
        if small > 0 {
            tracing::warn!("{} images are smaller than load_size {} and will be upscaled", small, cfg.load_size);
        }

        // ── Step 4: Train / validation split ──────────────────────────────────
        let (train, val) = split_train_val(content, cfg.val_fraction, cfg.seed);
        tracing::info!("Split: {} train, {} validation", train.len(), val.len());

        // ── Step 5: Build Burn datasets ───────────────────────────────────────
        // Random crop + flip for training, centre crop for validation
        let train_prep = ImagePreprocessor::train(cfg.load_size, cfg.crop_size);
        let eval_prep  = ImagePreprocessor::eval(cfg.load_size, cfg.crop_size);
        let data = TrainData {
            content_train: ImageDataset::new(train, train_prep),
            content_val:   ImageDataset::new(val, eval_prep),
            style_train:   ImageDataset::new(style.clone(), train_prep),
            style_val:     ImageDataset::new(style, eval_prep),
        };

        // ── Step 6: Save config for inference ─────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt_manager.save_config(cfg)?;

        Ok((data, ckpt_manager))
    }
}
