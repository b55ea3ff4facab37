// ============================================================
// Layer 5 — Decoder (the trainable generator)
// ============================================================
// Mirrors the encoder: relu4_1 features back to an RGB image.
// Each block is a stack of 3×3 conv + ReLU, followed by a nearest
// ×2 upsample (except after the last block):
//
//   block 0: 8b → 4b                          ↑2
//   block 1: 4b → 4b, 4b → 4b, 4b → 4b, 4b → 2b ↑2
//   block 2: 2b → 2b, 2b → b                    ↑2
//   block 3: b → b
//   output:  b → 3   (no activation)

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        PaddingConfig2d,
    },
    prelude::*,
    tensor::{
        activation::relu,
        module::interpolate,
        ops::{InterpolateMode, InterpolateOptions},
    },
};

#[derive(Config, Debug)]
pub struct DecoderConfig {
    /// Must match the encoder's base width.
    #[config(default = 64)]
    pub base_channels: usize,
}

impl DecoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Decoder<B> {
        let b = self.base_channels;
        let conv = |cin: usize, cout: usize| -> Conv2d<B> {
            Conv2dConfig::new([cin, cout], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device)
        };

        let layout: [&[(usize, usize)]; 4] = [
            &[(8 * b, 4 * b)],
            &[(4 * b, 4 * b), (4 * b, 4 * b), (4 * b, 4 * b), (4 * b, 2 * b)],
            &[(2 * b, 2 * b), (2 * b, b)],
            &[(b, b)],
        ];

        let blocks = layout
            .iter()
            .map(|convs| DecoderBlock {
                convs: convs.iter().map(|&(cin, cout)| conv(cin, cout)).collect(),
            })
            .collect();

        Decoder { blocks, output: conv(b, 3) }
    }
}

#[derive(Module, Debug)]
pub struct DecoderBlock<B: Backend> {
    pub convs: Vec<Conv2d<B>>,
}

impl<B: Backend> DecoderBlock<B> {
    pub fn forward(&self, mut x: Tensor<B, 4>) -> Tensor<B, 4> {
        for conv in &self.convs {
            x = relu(conv.forward(x));
        }
        x
    }
}

#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    pub blocks: Vec<DecoderBlock<B>>,
    pub output: Conv2d<B>,
}

impl<B: Backend> Decoder<B> {
    /// features: [N, 8b, h, w] → images: [N, 3, 8h, 8w]
    pub fn forward(&self, features: Tensor<B, 4>) -> Tensor<B, 4> {
        let last = self.blocks.len().saturating_sub(1);
        let mut x = features;
        for (i, block) in self.blocks.iter().enumerate() {
            x = block.forward(x);
            if i < last {
                x = upsample(x);
            }
        }
        self.output.forward(x)
    }
}

fn upsample<B: Backend>(x: Tensor<B, 4>) -> Tensor<B, 4> {
    let [_, _, h, w] = x.dims();
    interpolate(
        x,
        [2 * h, 2 * w],
        InterpolateOptions::new(InterpolateMode::Nearest),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::encoder::VggEncoderConfig;
    use burn::backend::NdArray;

    #[test]
    fn test_decoder_inverts_encoder_shape() {
        let device  = Default::default();
        let encoder = VggEncoderConfig::new().with_base_channels(4).init::<NdArray>(&device);
        let decoder = DecoderConfig::new().with_base_channels(4).init::<NdArray>(&device);

        let images = Tensor::<NdArray, 4>::ones([2, 3, 24, 40], &device);
        let out    = decoder.forward(encoder.encode(images));
        assert_eq!(out.dims(), [2, 3, 24, 40]);
    }

    #[test]
    fn test_block_layout() {
        let device  = Default::default();
        let decoder = DecoderConfig::new().with_base_channels(2).init::<NdArray>(&device);
        let sizes: Vec<usize> = decoder.blocks.iter().map(|b| b.convs.len()).collect();
        assert_eq!(sizes, vec![1, 4, 2, 1]);
    }
}
