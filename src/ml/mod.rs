// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All network definitions, losses and the training loop.
//
//   encoder.rs       — frozen VGG-19 trunk up to relu4_1
//   adain.rs         — channel statistics, AdaIN, Gram matrices
//   decoder.rs       — mirror of the encoder, upsampling to RGB
//   discriminator.rs — PatchGAN critic
//   loss.rs          — content, style, adversarial, TV losses
//   trainer.rs       — adversarial optimisation loop
//   stylizer.rs      — inference from a checkpoint
//
// Reference: Huang & Belongie (2017) Arbitrary Style Transfer in
//            Real-time with Adaptive Instance Normalization
//            Isola et al. (2017) Image-to-Image Translation (PatchGAN)

pub mod encoder;
pub mod adain;
pub mod decoder;
pub mod discriminator;

/// Content, style and adversarial objectives
pub mod loss;

/// Training loop with validation and checkpointing
pub mod trainer;

/// Inference engine, loads a checkpoint and stylizes images
pub mod stylizer;
