// ============================================================
// Layer 4 — Image Preprocessor
// ============================================================
// Turns a decoded image into the float buffer the model eats.
//
// Steps (applied in order):
//   1. Resize so the shorter side equals `load_size` (aspect kept)
//   2. Crop a `crop_size` square: random for training, centred
//      for evaluation
//   3. Optionally flip horizontally (training only)
//   4. Convert RGB u8 (HWC) to f32 in [0, 1] (CHW)
//
// The reverse direction (`to_image`) is used for sample grids and
// for the stylize command.

use anyhow::{bail, Result};
use image::{imageops::FilterType, DynamicImage, RgbImage};
use rand::Rng;

/// The encoder downsamples three times, so spatial sizes fed to the
/// model must be multiples of this.
pub const SIZE_MULTIPLE: u32 = 8;

/// Smallest edge the model accepts: relu4_1 must keep at least 2×2
/// positions for its variance to be defined.
pub const MIN_EDGE: u32 = 2 * SIZE_MULTIPLE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropMode {
    Random,
    Center,
}

#[derive(Debug, Clone, Copy)]
pub struct ImagePreprocessor {
    pub load_size: u32,
    pub crop_size: u32,
    pub crop:      CropMode,
    pub flip:      bool,
}

impl ImagePreprocessor {
    /// Random crop + random horizontal flip.
    pub fn train(load_size: u32, crop_size: u32) -> Self {
        Self { load_size, crop_size, crop: CropMode::Random, flip: true }
    }

    /// Deterministic centre crop, no flip.
    pub fn eval(load_size: u32, crop_size: u32) -> Self {
        Self { load_size, crop_size, crop: CropMode::Center, flip: false }
    }

    /// Run the full pipeline and return a CHW buffer of
    /// `3 * crop_size * crop_size` floats.
    pub fn process<R: Rng + ?Sized>(&self, img: &DynamicImage, rng: &mut R) -> Vec<f32> {
        // ── Step 1: Resize shorter side ──────────────────────────────────────
        let (w, h) = scaled_dims(img.width(), img.height(), self.load_size.max(self.crop_size));
        let resized = img.resize_exact(w, h, FilterType::Triangle);

        // ── Step 2: Crop ─────────────────────────────────────────────────────
        let c = self.crop_size;
        let (x, y) = match self.crop {
            CropMode::Random => (rng.gen_range(0..=w - c), rng.gen_range(0..=h - c)),
            CropMode::Center => ((w - c) / 2, (h - c) / 2),
        };
        let mut cropped = resized.crop_imm(x, y, c, c);

        // ── Step 3: Flip ─────────────────────────────────────────────────────
        if self.flip && rng.gen_bool(0.5) {
            cropped = cropped.fliph();
        }

        // ── Step 4: HWC u8 → CHW f32 ─────────────────────────────────────────
        to_chw(&cropped.to_rgb8())
    }
}

/// Dimensions after scaling so that the shorter side equals `short`.
pub fn scaled_dims(width: u32, height: u32, short: u32) -> (u32, u32) {
    if width <= height {
        let h = ((height as f64) * short as f64 / width as f64).round() as u32;
        (short, h.max(short))
    } else {
        let w = ((width as f64) * short as f64 / height as f64).round() as u32;
        (w.max(short), short)
    }
}

/// Prepare an arbitrary image for inference: optionally rescale so the
/// shorter side is `size` (0 keeps the original size), then trim the
/// right and bottom edges down to multiples of [`SIZE_MULTIPLE`].
pub fn fit_for_inference(img: &DynamicImage, size: u32) -> Result<DynamicImage> {
    let img = if size > 0 {
        let (w, h) = scaled_dims(img.width(), img.height(), size);
        img.resize_exact(w, h, FilterType::Triangle)
    } else {
        img.clone()
    };

    let w = img.width() - img.width() % SIZE_MULTIPLE;
    let h = img.height() - img.height() % SIZE_MULTIPLE;
    if w < MIN_EDGE || h < MIN_EDGE {
        bail!(
            "image of {}x{} is too small; both edges must be at least {} pixels",
            img.width(),
            img.height(),
            MIN_EDGE
        );
    }
    Ok(img.crop_imm(0, 0, w, h))
}

/// RGB u8 image → CHW f32 in [0, 1].
pub fn to_chw(rgb: &RgbImage) -> Vec<f32> {
    let (w, h) = rgb.dimensions();
    let plane = (w * h) as usize;
    let mut out = vec![0.0f32; 3 * plane];
    for (i, p) in rgb.pixels().enumerate() {
        out[i]             = p[0] as f32 / 255.0;
        out[plane + i]     = p[1] as f32 / 255.0;
        out[2 * plane + i] = p[2] as f32 / 255.0;
    }
    out
}

/// CHW f32 → RGB u8 image. Values are clamped to [0, 1] first.
pub fn to_image(chw: &[f32], width: u32, height: u32) -> Result<RgbImage> {
    let plane = (width * height) as usize;
    if chw.len() != 3 * plane {
        bail!(
            "pixel buffer has {} values, expected {} for a 3x{}x{} image",
            chw.len(),
            3 * plane,
            height,
            width
        );
    }

    let mut raw = Vec::with_capacity(3 * plane);
    for i in 0..plane {
        for c in 0..3 {
            let v = chw[c * plane + i].clamp(0.0, 1.0);
            raw.push((v * 255.0).round() as u8);
        }
    }
    RgbImage::from_raw(width, height, raw)
        .ok_or_else(|| anyhow::anyhow!("cannot build {}x{} image", width, height))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_scaled_dims_keeps_aspect() {
        assert_eq!(scaled_dims(640, 480, 240), (320, 240));
        assert_eq!(scaled_dims(480, 640, 240), (240, 320));
        assert_eq!(scaled_dims(100, 100, 64), (64, 64));
    }

    #[test]
    fn test_process_output_length() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(50, 30, Rgb([255, 0, 128])));
        let p   = ImagePreprocessor::train(24, 16);
        let mut rng = StdRng::seed_from_u64(7);
        let out = p.process(&img, &mut rng);
        assert_eq!(out.len(), 3 * 16 * 16);
        // Uniform colour survives resize, crop and flip
        assert!(out[0] > 0.99);
        assert!(out[16 * 16] < 0.01);
    }

    #[test]
    fn test_center_crop_is_deterministic() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(40, 20, |x, y| {
            Rgb([(x * 6) as u8, (y * 12) as u8, 0])
        }));
        let p = ImagePreprocessor::eval(20, 16);
        let a = p.process(&img, &mut StdRng::seed_from_u64(1));
        let b = p.process(&img, &mut StdRng::seed_from_u64(2));
        assert_eq!(a, b);
    }

    #[test]
    fn test_chw_image_conversion_is_lossless_for_u8() {
        let img = RgbImage::from_fn(5, 3, |x, y| Rgb([x as u8 * 40, y as u8 * 80, 7]));
        let chw = to_chw(&img);
        assert_eq!(to_image(&chw, 5, 3).unwrap(), img);
    }

    #[test]
    fn test_to_image_clamps_and_checks_length() {
        let out = to_image(&[2.0, -1.0, 0.5], 1, 1).unwrap();
        assert_eq!(out.get_pixel(0, 0), &Rgb([255, 0, 128]));
        assert!(to_image(&[0.0; 5], 1, 1).is_err());
    }

    #[test]
    fn test_fit_for_inference_trims_to_multiple_of_eight() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(45, 37));
        let fitted = fit_for_inference(&img, 0).unwrap();
        assert_eq!((fitted.width(), fitted.height()), (40, 32));

        let small = DynamicImage::ImageRgb8(RgbImage::new(12, 40));
        assert!(fit_for_inference(&small, 0).is_err());
    }
}
