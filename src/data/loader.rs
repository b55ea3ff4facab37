// ============================================================
// Layer 4 — Image Folder Loader
// ============================================================
// Walks a directory tree and collects every decodable image.
//
// Only the image header is read here (image::image_dimensions),
// so listing a folder of thousands of photos stays cheap. The
// pixels themselves are decoded later, per sample, by the dataset.
//
// Unreadable files are skipped with a warning rather than
// aborting the whole run.

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::image_record::ImageRecord;
use crate::domain::traits::ImageSource;

/// File extensions accepted as images (compared case-insensitively).
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

/// Loads every image below a directory, recursively.
pub struct ImageFolderLoader {
    dir: PathBuf,
}

impl ImageFolderLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ImageSource for ImageFolderLoader {
    fn load_all(&self) -> Result<Vec<ImageRecord>> {
        if !self.dir.exists() {
            tracing::warn!(
                "Image directory '{}' does not exist; returning no images",
                self.dir.display()
            );
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        let mut skipped = 0usize;

        // Depth-first walk with an explicit stack of directories
        let mut pending = vec![self.dir.clone()];
        while let Some(dir) = pending.pop() {
            for entry in fs::read_dir(&dir)
                .with_context(|| format!("Cannot read directory '{}'", dir.display()))?
            {
                let path = entry?.path();

                if path.is_dir() {
                    pending.push(path);
                    continue;
                }
                if !has_image_extension(&path) {
                    continue;
                }

                match image::image_dimensions(&path) {
                    Ok((width, height)) => {
                        tracing::debug!("Found: {} ({}x{})", path.display(), width, height);
                        records.push(ImageRecord::new(path, width, height));
                    }
                    Err(e) => {
                        skipped += 1;
                        tracing::warn!("Skipping '{}': {}", path.display(), e);
                    }
                }
            }
        }

        // read_dir order is platform dependent
        records.sort_by(|a, b| a.path.cmp(&b.path));

        tracing::info!(
            "Found {} images in '{}' ({} skipped)",
            records.len(),
            self.dir.display(),
            skipped
        );
        Ok(records)
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_png(path: &Path, w: u32, h: u32) {
        RgbImage::from_pixel(w, h, Rgb([10, 20, 30])).save(path).unwrap();
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let loader = ImageFolderLoader::new("/definitely/not/here");
        assert!(loader.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_walks_subdirectories_and_sorts() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("nested")).unwrap();
        write_png(&tmp.path().join("b.png"), 8, 6);
        write_png(&tmp.path().join("nested").join("a.PNG"), 4, 4);
        fs::write(tmp.path().join("notes.txt"), "not an image").unwrap();

        let records = ImageFolderLoader::new(tmp.path()).load_all().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].path < records[1].path);

        let b = records.iter().find(|r| r.display_name() == "b.png").unwrap();
        assert_eq!((b.width, b.height), (8, 6));
    }

    #[test]
    fn test_skips_corrupt_images() {
        let tmp = tempfile::tempdir().unwrap();
        write_png(&tmp.path().join("good.png"), 4, 4);
        fs::write(tmp.path().join("broken.jpg"), b"\x00\x01garbage").unwrap();

        let records = ImageFolderLoader::new(tmp.path()).load_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].display_name(), "good.png");
    }
}
