// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits, not
// against the concrete loader or model types.

use anyhow::Result;
use image::{DynamicImage, RgbImage};

use crate::domain::image_record::ImageRecord;

// ─── ImageSource ──────────────────────────────────────────────────────────────
/// Any component that can enumerate training images.
///
/// Implementations:
///   - ImageFolderLoader → walks a directory tree of jpg/png files
pub trait ImageSource {
    /// List every usable image, sorted by path.
    fn load_all(&self) -> Result<Vec<ImageRecord>>;
}

// ─── StyleTransfer ────────────────────────────────────────────────────────────
/// Any component that renders a content image in the style of another.
///
/// `alpha` in [0, 1] trades content (0) against style (1).
pub trait StyleTransfer {
    fn stylize(
        &self,
        content: &DynamicImage,
        style:   &DynamicImage,
        alpha:   f32,
    ) -> Result<RgbImage>;
}
