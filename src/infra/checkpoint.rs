// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Everything needed to resume an adversarial run lives in one
// directory:
//
//   checkpoints/
//     train_config.json             ← hyper-parameters (stylize reads this)
//     training_state.json           ← { epoch, step } of the last save
//     encoder.mpk                   ← frozen VGG weights used for training
//     decoder.mpk.gz                ← latest decoder
//     decoder_epoch_{n}.mpk.gz      ← decoder after epoch n
//     discriminator.mpk.gz
//     optimizer_decoder.mpk.gz
//     optimizer_discriminator.mpk.gz
//
// Records use Burn's CompactRecorder (MessagePack + gzip, half
// precision), except the encoder snapshot, which is stored at full
// precision so inference sees exactly the weights training used.
// Loading fails if the architecture doesn't match.

use anyhow::{Context, Result};
use burn::{
    module::Module,
    optim::Optimizer,
    prelude::*,
    record::{CompactRecorder, FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::application::train_use_case::TrainConfig;
use crate::ml::{decoder::Decoder, discriminator::Discriminator, encoder::VggEncoder};

const CONFIG_FILE: &str = "train_config.json";
const STATE_FILE:  &str = "training_state.json";
const ENCODER:     &str = "encoder";
const DECODER:     &str = "decoder";
const DECODER_EPOCH_PREFIX: &str = "decoder_epoch_";
const DISCRIMINATOR:     &str = "discriminator";
const OPTIM_DECODER:     &str = "optimizer_decoder";
const OPTIM_DISCRIMINATOR: &str = "optimizer_discriminator";

/// Progress marker written next to the weights.
///
/// `epoch` is the first epoch that still has to run; `step` counts
/// optimisation steps since the start of training.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingState {
    pub epoch: usize,
    pub step:  usize,
}

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create the manager, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    // ─── Config ───────────────────────────────────────────────────────────────

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Make sure you have run 'train' first.",
                path.display()
            )
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config in '{}'", path.display()))
    }

    // ─── Training state ───────────────────────────────────────────────────────

    /// `None` when no training state has been written yet.
    pub fn latest_state(&self) -> Result<Option<TrainingState>> {
        let path = self.dir.join(STATE_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let s = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        Ok(Some(serde_json::from_str(&s)?))
    }

    // ─── Encoder ──────────────────────────────────────────────────────────────

    /// Snapshot the encoder so inference uses exactly the weights
    /// the decoder was trained against.
    pub fn save_encoder<B: Backend>(&self, encoder: &VggEncoder<B>) -> Result<()> {
        let path = self.dir.join(ENCODER);
        encoder
            .clone()
            .save_file(path.clone(), &NamedMpkFileRecorder::<FullPrecisionSettings>::new())
            .with_context(|| format!("Failed to save encoder to '{}'", path.display()))
    }

    pub fn load_encoder<B: Backend>(&self, encoder: VggEncoder<B>, device: &B::Device) -> Result<VggEncoder<B>> {
        let path = self.dir.join(ENCODER);
        encoder
            .load_file(path.clone(), &NamedMpkFileRecorder::<FullPrecisionSettings>::new(), device)
            .with_context(|| format!("Cannot load encoder from '{}'", path.display()))
    }

    pub fn has_encoder(&self) -> bool {
        self.dir.join(ENCODER).with_extension("mpk").exists()
    }

    // ─── Decoder ──────────────────────────────────────────────────────────────

    pub fn load_decoder<B: Backend>(&self, decoder: Decoder<B>, device: &B::Device) -> Result<Decoder<B>> {
        let path = self.dir.join(DECODER);
        decoder
            .load_file(path.clone(), &CompactRecorder::new(), device)
            .with_context(|| {
                format!(
                    "Cannot load decoder '{}'. Have you trained the model first?",
                    path.display()
                )
            })
    }

    /// Keep a per-epoch copy of the decoder alongside the latest one.
    pub fn save_decoder_epoch<B: Backend>(&self, decoder: &Decoder<B>, epoch: usize) -> Result<()> {
        let path = self.dir.join(format!("{DECODER_EPOCH_PREFIX}{epoch}"));
        decoder
            .clone()
            .save_file(path.clone(), &CompactRecorder::new())
            .with_context(|| format!("Failed to save '{}'", path.display()))
    }

    /// Forget a previous run: removes the training state and the
    /// per-epoch decoder history. Config and encoder files are kept.
    pub fn clear_history(&self) -> Result<()> {
        let state = self.dir.join(STATE_FILE);
        if state.exists() {
            fs::remove_file(&state)
                .with_context(|| format!("Cannot remove '{}'", state.display()))?;
        }

        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Cannot read '{}'", self.dir.display()))?
        {
            let path = entry?.path();
            let is_history = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(DECODER_EPOCH_PREFIX));
            if is_history && path.is_file() {
                fs::remove_file(&path)
                    .with_context(|| format!("Cannot remove '{}'", path.display()))?;
                tracing::debug!("Removed stale '{}'", path.display());
            }
        }
        Ok(())
    }

    // ─── Full training checkpoint ─────────────────────────────────────────────

    /// Write decoder, discriminator, both optimiser states and the
    /// training state. The state file is written last.
    pub fn save_training<B, OD, OC>(
        &self,
        decoder:        &Decoder<B>,
        discriminator:  &Discriminator<B>,
        optim_decoder:  &OD,
        optim_disc:     &OC,
        state:          TrainingState,
    ) -> Result<()>
    where
        B:  AutodiffBackend,
        OD: Optimizer<Decoder<B>, B>,
        OC: Optimizer<Discriminator<B>, B>,
    {
        let recorder = CompactRecorder::new();

        decoder
            .clone()
            .save_file(self.dir.join(DECODER), &recorder)
            .context("Failed to save decoder")?;
        discriminator
            .clone()
            .save_file(self.dir.join(DISCRIMINATOR), &recorder)
            .context("Failed to save discriminator")?;
        Recorder::<B>::record(&recorder, optim_decoder.to_record(), self.dir.join(OPTIM_DECODER))
            .context("Failed to save decoder optimizer")?;
        Recorder::<B>::record(&recorder, optim_disc.to_record(), self.dir.join(OPTIM_DISCRIMINATOR))
            .context("Failed to save discriminator optimizer")?;

        let path = self.dir.join(STATE_FILE);
        fs::write(&path, serde_json::to_string_pretty(&state)?)
            .with_context(|| format!("Failed to write '{}'", path.display()))?;

        tracing::debug!("Saved checkpoint: epoch {} step {}", state.epoch, state.step);
        Ok(())
    }

    /// Restore everything written by [`save_training`](Self::save_training).
    /// Returns `None`, leaving the inputs untouched, when no state exists.
    pub fn load_training<B, OD, OC>(
        &self,
        decoder:       Decoder<B>,
        discriminator: Discriminator<B>,
        optim_decoder: OD,
        optim_disc:    OC,
        device:        &B::Device,
    ) -> Result<ResumePoint<B, OD, OC>>
    where
        B:  AutodiffBackend,
        OD: Optimizer<Decoder<B>, B>,
        OC: Optimizer<Discriminator<B>, B>,
    {
        let Some(state) = self.latest_state()? else {
            return Ok(ResumePoint { decoder, discriminator, optim_decoder, optim_disc, state: None });
        };

        let recorder = CompactRecorder::new();
        let decoder = self.load_decoder(decoder, device)?;
        let discriminator = discriminator
            .load_file(self.dir.join(DISCRIMINATOR), &recorder, device)
            .context("Cannot load discriminator checkpoint")?;

        let record = Recorder::<B>::load(&recorder, self.dir.join(OPTIM_DECODER), device)
            .context("Cannot load decoder optimizer checkpoint")?;
        let optim_decoder = optim_decoder.load_record(record);

        let record = Recorder::<B>::load(&recorder, self.dir.join(OPTIM_DISCRIMINATOR), device)
            .context("Cannot load discriminator optimizer checkpoint")?;
        let optim_disc = optim_disc.load_record(record);

        tracing::info!("Resuming from epoch {} step {}", state.epoch + 1, state.step);
        Ok(ResumePoint { decoder, discriminator, optim_decoder, optim_disc, state: Some(state) })
    }
}

/// Models and optimisers after an attempted resume.
pub struct ResumePoint<B: AutodiffBackend, OD, OC> {
    pub decoder:       Decoder<B>,
    pub discriminator: Discriminator<B>,
    pub optim_decoder: OD,
    pub optim_disc:    OC,
    pub state:         Option<TrainingState>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{decoder::DecoderConfig, discriminator::DiscriminatorConfig};
    use burn::backend::{Autodiff, NdArray};
    use burn::optim::AdamConfig;

    type TB = Autodiff<NdArray>;

    #[test]
    fn test_config_roundtrip() {
        let tmp  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(tmp.path());

        let cfg = TrainConfig { batch_size: 3, epochs: 7, ..TrainConfig::default() };
        ckpt.save_config(&cfg).unwrap();
        let back = ckpt.load_config().unwrap();
        assert_eq!(back.batch_size, 3);
        assert_eq!(back.epochs, 7);
    }

    #[test]
    fn test_missing_config_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(CheckpointManager::new(tmp.path()).load_config().is_err());
    }

    #[test]
    fn test_no_state_means_fresh_start() {
        let tmp    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(tmp.path());
        let device = Default::default();

        assert!(ckpt.latest_state().unwrap().is_none());

        let resume = ckpt
            .load_training(
                DecoderConfig::new().with_base_channels(2).init::<TB>(&device),
                DiscriminatorConfig::new().with_base_channels(2).init::<TB>(&device),
                AdamConfig::new().init::<TB, Decoder<TB>>(),
                AdamConfig::new().init::<TB, Discriminator<TB>>(),
                &device,
            )
            .unwrap();
        assert!(resume.state.is_none());
    }

    #[test]
    fn test_training_checkpoint_roundtrip() {
        let tmp    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(tmp.path());
        let device = Default::default();

        let dec_cfg  = DecoderConfig::new().with_base_channels(2);
        let disc_cfg = DiscriminatorConfig::new().with_base_channels(2);
        let decoder  = dec_cfg.init::<TB>(&device);
        let disc     = disc_cfg.init::<TB>(&device);
        let od = AdamConfig::new().init::<TB, Decoder<TB>>();
        let oc = AdamConfig::new().init::<TB, Discriminator<TB>>();

        let state = TrainingState { epoch: 2, step: 17 };
        ckpt.save_training(&decoder, &disc, &od, &oc, state).unwrap();

        let resume = ckpt
            .load_training(dec_cfg.init::<TB>(&device), disc_cfg.init::<TB>(&device), od, oc, &device)
            .unwrap();
        assert_eq!(resume.state, Some(state));

        // Half-precision records: compare loosely
        let x = Tensor::<TB, 4>::ones([1, 16, 2, 2], &device);
        let diff: f32 = (decoder.forward(x.clone()) - resume.decoder.forward(x))
            .abs()
            .max()
            .into_scalar();
        assert!(diff < 5e-2);
    }

    #[test]
    fn test_encoder_snapshot_is_full_precision() {
        use crate::ml::encoder::VggEncoderConfig;

        let tmp    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(tmp.path());
        let device = Default::default();
        let config = VggEncoderConfig::new().with_base_channels(2);

        assert!(!ckpt.has_encoder());
        let encoder = config.init::<NdArray>(&device);
        ckpt.save_encoder(&encoder).unwrap();
        assert!(ckpt.has_encoder());

        let loaded = ckpt.load_encoder(config.init::<NdArray>(&device), &device).unwrap();
        let x = Tensor::<NdArray, 4>::ones([1, 3, 16, 16], &device).mul_scalar(0.3);
        let a = encoder.encode(x.clone()).into_data().to_vec::<f32>().unwrap();
        let b = loaded.encode(x).into_data().to_vec::<f32>().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_clear_history_keeps_config_and_encoder() {
        let tmp    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(tmp.path());
        let device = Default::default();

        ckpt.save_config(&TrainConfig::default()).unwrap();
        let decoder = DecoderConfig::new().with_base_channels(2).init::<NdArray>(&device);
        ckpt.save_decoder_epoch(&decoder, 1).unwrap();
        ckpt.save_decoder_epoch(&decoder, 2).unwrap();
        fs::write(tmp.path().join(STATE_FILE), r#"{ "epoch": 2, "step": 9 }"#).unwrap();
        assert!(ckpt.latest_state().unwrap().is_some());

        ckpt.clear_history().unwrap();

        assert!(ckpt.latest_state().unwrap().is_none());
        let left: Vec<String> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(left.iter().all(|n| !n.starts_with(DECODER_EPOCH_PREFIX)), "{left:?}");
        assert!(ckpt.load_config().is_ok());
    }
}
