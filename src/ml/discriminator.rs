// ============================================================
// Layer 5 — PatchGAN Discriminator
// ============================================================
// Scores overlapping patches as "real artwork" vs "stylized
// photograph". Output is a map of raw logits, one per patch:
//
//   conv4×4/2  3  → b              LeakyReLU(0.2)
//   conv4×4/2  b  → 2b   InstanceNorm LeakyReLU   ┐ num_layers − 1
//   ...                                           ┘ times
//   conv4×4/1  →  ×2     InstanceNorm LeakyReLU
//   conv4×4/1  → 1

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        InstanceNorm, InstanceNormConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::leaky_relu,
};

const NEGATIVE_SLOPE: f64 = 0.2;

#[derive(Config, Debug)]
pub struct DiscriminatorConfig {
    #[config(default = 64)]
    pub base_channels: usize,
    /// Number of stride-2 convolutions.
    #[config(default = 3)]
    pub num_layers: usize,
}

impl DiscriminatorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Discriminator<B> {
        let conv = |cin: usize, cout: usize, stride: usize| -> Conv2d<B> {
            Conv2dConfig::new([cin, cout], [4, 4])
                .with_stride([stride, stride])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device)
        };

        let b = self.base_channels;
        let input = conv(3, b, 2);

        let mut blocks = Vec::new();
        let mut channels = b;
        for _ in 1..self.num_layers {
            blocks.push(DiscBlock {
                conv: conv(channels, channels * 2, 2),
                norm: InstanceNormConfig::new(channels * 2).init(device),
            });
            channels *= 2;
        }
        blocks.push(DiscBlock {
            conv: conv(channels, channels * 2, 1),
            norm: InstanceNormConfig::new(channels * 2).init(device),
        });
        channels *= 2;

        Discriminator { input, blocks, output: conv(channels, 1, 1) }
    }
}

#[derive(Module, Debug)]
pub struct DiscBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub norm: InstanceNorm<B>,
}

#[derive(Module, Debug)]
pub struct Discriminator<B: Backend> {
    pub input:  Conv2d<B>,
    pub blocks: Vec<DiscBlock<B>>,
    pub output: Conv2d<B>,
}

impl<B: Backend> Discriminator<B> {
    /// images: [N, 3, H, W] → logits: [N, 1, h, w]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut x = leaky_relu(self.input.forward(images), NEGATIVE_SLOPE);
        for block in &self.blocks {
            x = leaky_relu(block.norm.forward(block.conv.forward(x)), NEGATIVE_SLOPE);
        }
        self.output.forward(x)
    }
}
