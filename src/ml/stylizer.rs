// ============================================================
// Layer 5 — Stylizer (Inference)
// ============================================================
// Rebuilds the encoder/decoder pair from a checkpoint directory
// and renders one content image in the style of another:
//
//   c4 = E(content)   s4 = E(style)
//   t  = α·AdaIN(c4, s4) + (1 − α)·c4
//   out = clamp(Dec(t), 0, 1)
//
// Runs on a plain (non-autodiff) backend.

use anyhow::{anyhow, Result};
use burn::prelude::*;
use image::{DynamicImage, RgbImage};

use crate::data::preprocessor::{fit_for_inference, to_chw};
use crate::domain::traits::StyleTransfer;
use crate::infra::{checkpoint::CheckpointManager, samples::tensor_to_images};
use crate::ml::{
    adain::{adaptive_instance_norm, blend},
    decoder::{Decoder, DecoderConfig},
    encoder::{VggEncoder, VggEncoderConfig},
};

pub struct Stylizer<B: Backend> {
    encoder: VggEncoder<B>,
    decoder: Decoder<B>,
    device:  B::Device,
    /// Shorter-side size images are rescaled to; 0 keeps them as they are.
    size:    u32,
}

impl<B: Backend> Stylizer<B> {
    pub fn new(encoder: VggEncoder<B>, decoder: Decoder<B>, device: B::Device) -> Self {
        Self { encoder, decoder, device, size: 0 }
    }

    /// Load the encoder snapshot and the latest decoder saved by training.
    pub fn from_checkpoint(ckpt: &CheckpointManager, device: B::Device) -> Result<Self> {
        let cfg = ckpt.load_config()?;
        tracing::info!("Rebuilding models with base_channels={}", cfg.base_channels);

        let encoder = VggEncoderConfig::new()
            .with_base_channels(cfg.base_channels)
            .init::<B>(&device);
        let encoder = ckpt.load_encoder(encoder, &device)?;

        let decoder = DecoderConfig::new()
            .with_base_channels(cfg.base_channels)
            .init::<B>(&device);
        let decoder = ckpt.load_decoder(decoder, &device)?;

        Ok(Self::new(encoder, decoder, device))
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    fn to_tensor(&self, img: &DynamicImage) -> Result<Tensor<B, 4>> {
        let rgb = fit_for_inference(img, self.size)?.to_rgb8();
        let (w, h) = rgb.dimensions();
        Ok(Tensor::<B, 1>::from_floats(to_chw(&rgb).as_slice(), &self.device)
            .reshape([1, 3, h as usize, w as usize]))
    }
}

impl<B: Backend> StyleTransfer for Stylizer<B> {
    fn stylize(&self, content: &DynamicImage, style: &DynamicImage, alpha: f32) -> Result<RgbImage> {
        let content = self.to_tensor(content)?;
        let style   = self.to_tensor(style)?;
        tracing::debug!("content {:?}, style {:?}", content.dims(), style.dims());

        let c4 = self.encoder.encode(content);
        let s4 = self.encoder.encode(style);
        let t  = blend(adaptive_instance_norm(c4.clone(), s4), c4, alpha);

        let out = self.decoder.forward(t);
        tensor_to_images(out)?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("decoder produced no image"))
    }
}
