// ============================================================
// Layer 2 — Stylize Use Case
// ============================================================
// Loads a trained checkpoint once, then renders content images
// in the style of a reference image.

use anyhow::{Context, Result};
use std::path::Path;

use crate::domain::traits::StyleTransfer;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::stylizer::Stylizer;

type InferBackend = burn::backend::Wgpu;

pub struct StylizeUseCase {
    stylizer: Box<dyn StyleTransfer>,
}

impl StylizeUseCase {
    pub fn new(checkpoint_dir: &str, size: u32) -> Result<Self> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        let ckpt   = CheckpointManager::new(checkpoint_dir);
        let stylizer = Stylizer::<InferBackend>::from_checkpoint(&ckpt, device)?.with_size(size);
        Ok(Self::with_stylizer(Box::new(stylizer)))
    }

    pub fn with_stylizer(stylizer: Box<dyn StyleTransfer>) -> Self {
        Self { stylizer }
    }

    /// Stylize `content` with `style` and write the result as PNG.
    pub fn stylize(&self, content: &Path, style: &Path, output: &Path, alpha: f32) -> Result<()> {
        let content_img = image::open(content)
            .with_context(|| format!("Cannot open content image '{}'", content.display()))?;
        let style_img = image::open(style)
            .with_context(|| format!("Cannot open style image '{}'", style.display()))?;

        let alpha = alpha.clamp(0.0, 1.0);
        tracing::info!(
            "Stylizing '{}' with '{}' (alpha={:.2})",
            content.display(),
            style.display(),
            alpha
        );
        let out = self.stylizer.stylize(&content_img, &style_img, alpha)?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create '{}'", parent.display()))?;
        }
        out.save_with_format(output, image::ImageFormat::Png)
            .with_context(|| format!("Cannot write '{}'", output.display()))?;
        tracing::info!("Wrote {}x{} image to '{}'", out.width(), out.height(), output.display());
        Ok(())
    }
}
