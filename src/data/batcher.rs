// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Implements Burn's Batcher trait: stacks N ImageItems of shape
// [3, H, W] into one tensor of shape [N, 3, H, W].
//
// All items of a loader share the same crop size, so a flat
// concatenation followed by a reshape is enough. Unreadable items
// (None) are dropped; a batch with nothing left becomes None.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::ImageItem;

/// A batch of images ready for the encoder, values in [0, 1].
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Shape: [batch_size, 3, height, width]
    pub images: Tensor<B, 4>,
}

#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<Option<ImageItem>, Option<ImageBatch<B>>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<Option<ImageItem>>) -> Option<ImageBatch<B>> {
        let items: Vec<ImageItem> = items.into_iter().flatten().collect();
        let (height, width) = items.first().map(|i| (i.height, i.width))?;
        let batch_size = items.len();

        let flat: Vec<f32> = items
            .iter()
            .flat_map(|i| i.pixels.iter().copied())
            .collect();

        let images = Tensor::<B, 1>::from_floats(flat.as_slice(), &self.device)
            .reshape([batch_size, 3, height, width]);

        Some(ImageBatch { images })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_batch_shape_and_order() {
        let device  = Default::default();
        let batcher = ImageBatcher::<NdArray>::new(device);

        let items = vec![
            Some(ImageItem { pixels: vec![0.0; 3 * 2 * 4], height: 2, width: 4 }),
            Some(ImageItem { pixels: vec![1.0; 3 * 2 * 4], height: 2, width: 4 }),
        ];
        let batch = batcher.batch(items).unwrap();
        assert_eq!(batch.images.dims(), [2, 3, 2, 4]);

        let second: f32 = batch.images.slice([1..2, 0..3, 0..2, 0..4]).mean().into_scalar();
        assert!((second - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_unreadable_items_are_dropped() {
        let device  = Default::default();
        let batcher = ImageBatcher::<NdArray>::new(device);

        let items = vec![
            None,
            Some(ImageItem { pixels: vec![0.5; 3 * 4 * 4], height: 4, width: 4 }),
            None,
        ];
        assert_eq!(batcher.batch(items).unwrap().images.dims(), [1, 3, 4, 4]);
        assert!(batcher.batch(vec![None, None]).is_none());
    }
}
