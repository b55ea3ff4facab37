use burn::data::dataset::Dataset;
use std::sync::Arc;

use crate::data::preprocessor::ImagePreprocessor;
use crate::domain::image_record::ImageRecord;

/// One preprocessed image: CHW floats in [0, 1].
#[derive(Debug, Clone)]
pub struct ImageItem {
    pub pixels: Vec<f32>,
    pub height: usize,
    pub width:  usize,
}

/// Lazily decoding image dataset. Each `get` reads the file from disk
/// and runs it through the preprocessor, so random crops differ per epoch.
///
/// Items are `Option<ImageItem>`: `Some(None)` marks a record that could
/// not be decoded. Returning `None` from `get` would end the loader's
/// iteration, so unreadable files travel to the batcher, which drops them.
#[derive(Clone)]
pub struct ImageDataset {
    records:      Arc<Vec<ImageRecord>>,
    preprocessor: ImagePreprocessor,
}

impl ImageDataset {
    pub fn new(records: Vec<ImageRecord>, preprocessor: ImagePreprocessor) -> Self {
        Self { records: Arc::new(records), preprocessor }
    }

    pub fn records(&self) -> &[ImageRecord] { &self.records }

    pub fn is_empty(&self) -> bool { self.records.is_empty() }

    fn decode(&self, record: &ImageRecord) -> Option<ImageItem> {
        let img = match image::open(&record.path) {
            Ok(img) => img,
            Err(e) => {
                tracing::warn!("Skipping '{}': {}", record.display_name(), e);
                return None;
            }
        };

        let pixels = self.preprocessor.process(&img, &mut rand::thread_rng());
        let side   = self.preprocessor.crop_size as usize;
        Some(ImageItem { pixels, height: side, width: side })
    }
}

impl Dataset<Option<ImageItem>> for ImageDataset {
    fn get(&self, index: usize) -> Option<Option<ImageItem>> {
        let record = self.records.get(index)?;
        Some(self.decode(record))
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_get_decodes_and_crops() {
        let tmp  = tempfile::tempdir().unwrap();
        let path = tmp.path().join("x.png");
        RgbImage::from_pixel(30, 20, Rgb([0, 255, 0])).save(&path).unwrap();

        let ds = ImageDataset::new(
            vec![ImageRecord::new(&path, 30, 20)],
            ImagePreprocessor::eval(16, 16),
        );
        assert_eq!(ds.len(), 1);

        let item = ds.get(0).flatten().unwrap();
        assert_eq!((item.height, item.width), (16, 16));
        assert_eq!(item.pixels.len(), 3 * 16 * 16);
        assert!(ds.get(1).is_none());
    }

    #[test]
    fn test_unreadable_file_is_a_hole_not_the_end() {
        let tmp  = tempfile::tempdir().unwrap();
        let good = tmp.path().join("good.png");
        let bad  = tmp.path().join("bad.png");
        RgbImage::from_pixel(20, 20, Rgb([1, 2, 3])).save(&good).unwrap();
        std::fs::write(&bad, b"not a png").unwrap();

        let ds = ImageDataset::new(
            vec![ImageRecord::new(&bad, 20, 20), ImageRecord::new(&good, 20, 20)],
            ImagePreprocessor::eval(16, 16),
        );
        assert_eq!(ds.len(), 2);
        assert!(matches!(ds.get(0), Some(None)));
        assert!(ds.get(1).flatten().is_some());
        assert!(ds.get(2).is_none());
    }
}
