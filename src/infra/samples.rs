// ============================================================
// Layer 6 — Sample Grids
// ============================================================
// Writes preview PNGs while training. Each row of the grid is one
// sample laid out as  content | style | stylized.

use anyhow::{bail, Context, Result};
use burn::prelude::*;
use image::{imageops, RgbImage};
use std::path::Path;

use crate::data::preprocessor::to_image;

/// Split a [N, 3, H, W] tensor into N images (values clamped to [0, 1]).
pub fn tensor_to_images<B: Backend>(images: Tensor<B, 4>) -> Result<Vec<RgbImage>> {
    let [n, _, h, w] = images.dims();
    let data = images
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("cannot read image tensor: {e:?}"))?;

    let per_image = 3 * h * w;
    (0..n)
        .map(|i| to_image(&data[i * per_image..(i + 1) * per_image], w as u32, h as u32))
        .collect()
}

/// Paste `columns` side by side, one row per sample.
/// All columns must hold the same number of equally sized images.
pub fn compose_grid(columns: &[Vec<RgbImage>]) -> Result<RgbImage> {
    let Some(first) = columns.first().and_then(|c| c.first()) else {
        bail!("cannot build a grid from no images");
    };
    let (w, h) = first.dimensions();
    let rows = columns[0].len();

    if columns.iter().any(|c| c.len() != rows) {
        bail!("grid columns have different lengths");
    }

    let mut grid = RgbImage::new(w * columns.len() as u32, h * rows as u32);
    for (col, images) in columns.iter().enumerate() {
        for (row, img) in images.iter().enumerate() {
            if img.dimensions() != (w, h) {
                bail!("grid images must all be {}x{}", w, h);
            }
            imageops::replace(&mut grid, img, (col as u32 * w) as i64, (row as u32 * h) as i64);
        }
    }
    Ok(grid)
}

/// Write a content | style | stylized grid to `path`.
pub fn save_grid<B: Backend>(
    content:  Tensor<B, 4>,
    style:    Tensor<B, 4>,
    stylized: Tensor<B, 4>,
    path:     &Path,
) -> Result<()> {
    let columns = vec![
        tensor_to_images(content)?,
        tensor_to_images(style)?,
        tensor_to_images(stylized)?,
    ];
    let grid = compose_grid(&columns)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    grid.save(path)
        .with_context(|| format!("Cannot write sample grid '{}'", path.display()))?;
    tracing::debug!("Wrote sample grid '{}'", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use image::Rgb;

    #[test]
    fn test_grid_layout() {
        let red  = RgbImage::from_pixel(2, 3, Rgb([255, 0, 0]));
        let blue = RgbImage::from_pixel(2, 3, Rgb([0, 0, 255]));
        let grid = compose_grid(&[vec![red.clone(), red], vec![blue.clone(), blue]]).unwrap();

        assert_eq!(grid.dimensions(), (4, 6));
        assert_eq!(grid.get_pixel(0, 5), &Rgb([255, 0, 0]));
        assert_eq!(grid.get_pixel(3, 0), &Rgb([0, 0, 255]));
    }

    #[test]
    fn test_grid_rejects_ragged_columns() {
        let img = RgbImage::new(2, 2);
        assert!(compose_grid(&[vec![img.clone()], vec![]]).is_err());
        assert!(compose_grid(&[]).is_err());
    }

    #[test]
    fn test_save_grid_writes_png() {
        let tmp    = tempfile::tempdir().unwrap();
        let path   = tmp.path().join("samples").join("step_1.png");
        let device = Default::default();
        let t = Tensor::<NdArray, 4>::full([2, 3, 8, 8], 0.5, &device);

        save_grid(t.clone(), t.clone(), t, &path).unwrap();
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (24, 16));
    }
}
