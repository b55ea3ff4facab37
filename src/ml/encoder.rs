// ============================================================
// Layer 5 — VGG-19 Encoder (frozen)
// ============================================================
// The first four stages of VGG-19, cut at relu4_1:
//
//   relu1_1 ← conv1_1
//   relu2_1 ← conv1_2, pool, conv2_1
//   relu3_1 ← conv2_2, pool, conv3_1
//   relu4_1 ← conv3_2, conv3_3, conv3_4, pool, conv4_1
//
// All four activations are returned: relu4_1 feeds AdaIN and the
// content loss, all of them feed the style loss.
//
// Pretrained ImageNet weights are expected as a burn record written
// with NamedMpkFileRecorder<FullPrecisionSettings>. The encoder is
// never optimised; `no_grad()` keeps its parameters out of the graph
// while gradients still flow through it to the decoder.

use anyhow::{Context, Result};
use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        PaddingConfig2d,
    },
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder},
    tensor::activation::relu,
};
use std::path::Path;

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD:  [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Config, Debug)]
pub struct VggEncoderConfig {
    /// Width of the first stage; VGG-19 uses 64 (→ 128, 256, 512).
    #[config(default = 64)]
    pub base_channels: usize,
}

impl VggEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> VggEncoder<B> {
        let b = self.base_channels;
        let conv = |cin: usize, cout: usize| {
            Conv2dConfig::new([cin, cout], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device)
        };

        VggEncoder {
            conv1_1: conv(3, b),
            conv1_2: conv(b, b),
            conv2_1: conv(b, 2 * b),
            conv2_2: conv(2 * b, 2 * b),
            conv3_1: conv(2 * b, 4 * b),
            conv3_2: conv(4 * b, 4 * b),
            conv3_3: conv(4 * b, 4 * b),
            conv3_4: conv(4 * b, 4 * b),
            conv4_1: conv(4 * b, 8 * b),
            pool:    MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct VggEncoder<B: Backend> {
    pub conv1_1: Conv2d<B>,
    pub conv1_2: Conv2d<B>,
    pub conv2_1: Conv2d<B>,
    pub conv2_2: Conv2d<B>,
    pub conv3_1: Conv2d<B>,
    pub conv3_2: Conv2d<B>,
    pub conv3_3: Conv2d<B>,
    pub conv3_4: Conv2d<B>,
    pub conv4_1: Conv2d<B>,
    pub pool:    MaxPool2d,
}

/// Intermediate activations, coarsest last.
#[derive(Debug, Clone)]
pub struct EncoderFeatures<B: Backend> {
    pub relu1_1: Tensor<B, 4>,
    pub relu2_1: Tensor<B, 4>,
    pub relu3_1: Tensor<B, 4>,
    pub relu4_1: Tensor<B, 4>,
}

impl<B: Backend> EncoderFeatures<B> {
    /// The four style layers in order relu1_1 .. relu4_1.
    pub fn layers(&self) -> [Tensor<B, 4>; 4] {
        [
            self.relu1_1.clone(),
            self.relu2_1.clone(),
            self.relu3_1.clone(),
            self.relu4_1.clone(),
        ]
    }
}

impl<B: Backend> VggEncoder<B> {
    /// images: [N, 3, H, W] in [0, 1]; H and W multiples of 8.
    pub fn forward(&self, images: Tensor<B, 4>) -> EncoderFeatures<B> {
        let x = self.normalize(images);

        let relu1_1 = relu(self.conv1_1.forward(x));

        let x = relu(self.conv1_2.forward(relu1_1.clone()));
        let x = self.pool.forward(x);
        let relu2_1 = relu(self.conv2_1.forward(x));

        let x = relu(self.conv2_2.forward(relu2_1.clone()));
        let x = self.pool.forward(x);
        let relu3_1 = relu(self.conv3_1.forward(x));

        let x = relu(self.conv3_2.forward(relu3_1.clone()));
        let x = relu(self.conv3_3.forward(x));
        let x = relu(self.conv3_4.forward(x));
        let x = self.pool.forward(x);
        let relu4_1 = relu(self.conv4_1.forward(x));

        EncoderFeatures { relu1_1, relu2_1, relu3_1, relu4_1 }
    }

    /// relu4_1 only.
    pub fn encode(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        self.forward(images).relu4_1
    }

    fn normalize(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let device = images.device();
        let mean = Tensor::<B, 1>::from_floats(IMAGENET_MEAN, &device).reshape([1, 3, 1, 1]);
        let std  = Tensor::<B, 1>::from_floats(IMAGENET_STD, &device).reshape([1, 3, 1, 1]);
        (images - mean) / std
    }

    /// Replace the weights with a pretrained record.
    pub fn load_pretrained(self, path: &Path, device: &B::Device) -> Result<Self> {
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        self.load_file(path.to_path_buf(), &recorder, device)
            .with_context(|| {
                format!("Cannot load encoder weights from '{}'", path.display())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_feature_shapes() {
        let device  = Default::default();
        let encoder = VggEncoderConfig::new().with_base_channels(4).init::<NdArray>(&device);

        let images = Tensor::<NdArray, 4>::ones([2, 3, 32, 32], &device);
        let f = encoder.forward(images);

        assert_eq!(f.relu1_1.dims(), [2, 4, 32, 32]);
        assert_eq!(f.relu2_1.dims(), [2, 8, 16, 16]);
        assert_eq!(f.relu3_1.dims(), [2, 16, 8, 8]);
        assert_eq!(f.relu4_1.dims(), [2, 32, 4, 4]);
    }

    #[test]
    fn test_activations_are_non_negative() {
        let device  = Default::default();
        let encoder = VggEncoderConfig::new().with_base_channels(2).init::<NdArray>(&device);
        let images  = Tensor::<NdArray, 4>::zeros([1, 3, 16, 16], &device);
        let min: f32 = encoder.encode(images).min().into_scalar();
        assert!(min >= 0.0);
    }

    #[test]
    fn test_pretrained_roundtrip_through_named_mpk() {
        let tmp    = tempfile::tempdir().unwrap();
        let path   = tmp.path().join("vgg");
        let device = Default::default();
        let config = VggEncoderConfig::new().with_base_channels(2);

        let saved = config.init::<NdArray>(&device);
        saved
            .clone()
            .save_file(path.clone(), &NamedMpkFileRecorder::<FullPrecisionSettings>::new())
            .unwrap();

        let loaded = config
            .init::<NdArray>(&device)
            .load_pretrained(&path.with_extension("mpk"), &device)
            .unwrap();

        let x = Tensor::<NdArray, 4>::ones([1, 3, 16, 16], &device);
        let diff: f32 = (saved.encode(x.clone()) - loaded.encode(x)).abs().max().into_scalar();
        assert!(diff < 1e-6);
    }

    #[test]
    fn test_missing_weights_file_is_an_error() {
        let device = Default::default();
        let result = VggEncoderConfig::new()
            .with_base_channels(2)
            .init::<NdArray>(&device)
            .load_pretrained(Path::new("/nope/vgg.mpk"), &device);
        assert!(result.is_err());
    }
}
