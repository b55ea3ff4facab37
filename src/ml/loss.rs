// ============================================================
// Layer 5 — Losses
// ============================================================
//   content   ‖f₄(g(t)) − t‖²                 (relu4_1 vs AdaIN target)
//   style     Σ_i ‖G(f_i(g(t))) − G(f_i(s))‖²   (Gram)
//             Σ_i ‖μ_i − μ'_i‖² + ‖σ_i − σ'_i‖²  (mean/std)
//   adv (D)   ½ [BCE(D(s), 1) + BCE(D(g(t)), 0)]
//   adv (G)   BCE(D(g(t)), 1)
//   tv        mean |∂x| + mean |∂y|
//
// BCE takes raw logits: max(x, 0) − x·y + log(1 + e^{−|x|}).

use burn::{
    nn::loss::{MseLoss, Reduction},
    prelude::*,
};

use crate::domain::style::StyleLossKind;
use crate::ml::adain::{gram_matrix, mean_std, EPS};

pub fn content_loss<B: Backend>(generated: Tensor<B, 4>, target: Tensor<B, 4>) -> Tensor<B, 1> {
    MseLoss::new().forward(generated, target, Reduction::Mean)
}

/// Sum of per-layer style distances. Layers are paired by position.
pub fn style_loss<B: Backend>(
    generated: &[Tensor<B, 4>],
    style:     &[Tensor<B, 4>],
    kind:      StyleLossKind,
) -> Tensor<B, 1> {
    let mse = MseLoss::new();
    let terms = generated.iter().zip(style).map(|(g, s)| match kind {
        StyleLossKind::Gram => mse.forward(
            gram_matrix(g.clone()),
            gram_matrix(s.clone()),
            Reduction::Mean,
        ),
        StyleLossKind::MeanStd => {
            let (g_mean, g_std) = mean_std(g.clone(), EPS);
            let (s_mean, s_std) = mean_std(s.clone(), EPS);
            mse.forward(g_mean, s_mean, Reduction::Mean)
                + mse.forward(g_std, s_std, Reduction::Mean)
        }
    });

    terms
        .reduce(|acc, t| acc + t)
        .unwrap_or_else(|| Tensor::zeros([1], &device_of(generated, style)))
}

fn device_of<B: Backend>(a: &[Tensor<B, 4>], b: &[Tensor<B, 4>]) -> B::Device {
    a.first()
        .or_else(|| b.first())
        .map(|t| t.device())
        .unwrap_or_default()
}

/// Mean binary cross-entropy of `logits` against a constant `target`.
pub fn bce_with_logits<B: Backend, const D: usize>(logits: Tensor<B, D>, target: f64) -> Tensor<B, 1> {
    let softplus = logits.clone().abs().neg().exp().add_scalar(1.0).log();
    (logits.clone().clamp_min(0.0) - logits.mul_scalar(target) + softplus).mean()
}

pub fn discriminator_loss<B: Backend>(real_logits: Tensor<B, 4>, fake_logits: Tensor<B, 4>) -> Tensor<B, 1> {
    (bce_with_logits(real_logits, 1.0) + bce_with_logits(fake_logits, 0.0)).div_scalar(2.0)
}

pub fn generator_adv_loss<B: Backend>(fake_logits: Tensor<B, 4>) -> Tensor<B, 1> {
    bce_with_logits(fake_logits, 1.0)
}

pub fn total_variation<B: Backend>(images: Tensor<B, 4>) -> Tensor<B, 1> {
    let [n, c, h, w] = images.dims();
    let dy = images.clone().slice([0..n, 0..c, 1..h, 0..w])
        - images.clone().slice([0..n, 0..c, 0..h - 1, 0..w]);
    let dx = images.clone().slice([0..n, 0..c, 0..h, 1..w])
        - images.slice([0..n, 0..c, 0..h, 0..w - 1]);
    dy.abs().mean() + dx.abs().mean()
}
