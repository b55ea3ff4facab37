// ============================================================
// Layer 5 — AdaIN and Feature Statistics
// ============================================================
// Adaptive instance normalisation (Huang & Belongie, 2017):
//
//   AdaIN(c, s) = σ(s) · (c − μ(c)) / σ(c) + μ(s)
//
// μ and σ are taken per sample and per channel over the spatial
// positions. σ uses the unbiased variance plus EPS before the
// square root.

use burn::prelude::*;

pub const EPS: f64 = 1e-5;

/// Per-(sample, channel) mean and standard deviation, each shaped
/// [N, C, 1, 1] so they broadcast against the input.
pub fn mean_std<B: Backend>(feat: Tensor<B, 4>, eps: f64) -> (Tensor<B, 4>, Tensor<B, 4>) {
    let [n, c, h, w] = feat.dims();
    let (var, mean) = feat.reshape([n, c, h * w]).var_mean(2);
    let std = var.add_scalar(eps).sqrt();
    (mean.reshape([n, c, 1, 1]), std.reshape([n, c, 1, 1]))
}

/// Re-normalise `content` features to the statistics of `style`.
/// Both must share N and C; spatial sizes may differ.
pub fn adaptive_instance_norm<B: Backend>(content: Tensor<B, 4>, style: Tensor<B, 4>) -> Tensor<B, 4> {
    let (c_mean, c_std) = mean_std(content.clone(), EPS);
    let (s_mean, s_std) = mean_std(style, EPS);
    (content - c_mean) / c_std * s_std + s_mean
}

/// Content/style trade-off: `alpha · t + (1 − alpha) · content`.
pub fn blend<B: Backend>(target: Tensor<B, 4>, content: Tensor<B, 4>, alpha: f32) -> Tensor<B, 4> {
    let alpha = alpha.clamp(0.0, 1.0) as f64;
    target.mul_scalar(alpha) + content.mul_scalar(1.0 - alpha)
}

/// Gram matrix F·Fᵀ / (C·H·W) with F = feat reshaped to [N, C, H·W].
pub fn gram_matrix<B: Backend>(feat: Tensor<B, 4>) -> Tensor<B, 3> {
    let [n, c, h, w] = feat.dims();
    let f = feat.reshape([n, c, h * w]);
    f.clone()
        .matmul(f.swap_dims(1, 2))
        .div_scalar((c * h * w) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::{Distribution, TensorData};

    type TB = NdArray;

    fn assert_close(a: Tensor<TB, 4>, b: Tensor<TB, 4>, tol: f32) {
        let diff: f32 = (a - b).abs().max().into_scalar();
        assert!(diff < tol, "max abs diff {diff}");
    }

    #[test]
    fn test_mean_std_known_values() {
        let device = Default::default();
        // One channel holding [1, 2, 3, 4]: mean 2.5, unbiased var 5/3
        let x = Tensor::<TB, 4>::from_data(
            TensorData::new(vec![1.0f32, 2.0, 3.0, 4.0], [1, 1, 2, 2]),
            &device,
        );
        let (mean, std) = mean_std(x, 0.0);
        let mean: f32 = mean.into_scalar();
        let std:  f32 = std.into_scalar();
        assert!((mean - 2.5).abs() < 1e-6);
        assert!((std - (5.0f32 / 3.0).sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_adain_output_takes_style_statistics() {
        let device  = Default::default();
        let content = Tensor::<TB, 4>::random([2, 3, 6, 6], Distribution::Normal(0.0, 1.0), &device);
        let style   = Tensor::<TB, 4>::random([2, 3, 4, 4], Distribution::Normal(3.0, 2.0), &device);

        let out = adaptive_instance_norm(content, style.clone());
        assert_eq!(out.dims(), [2, 3, 6, 6]);

        let (o_mean, o_std) = mean_std(out, EPS);
        let (s_mean, s_std) = mean_std(style, EPS);
        assert_close(o_mean, s_mean, 1e-3);
        assert_close(o_std, s_std, 1e-2);
    }

    #[test]
    fn test_blend_endpoints() {
        let device = Default::default();
        let t = Tensor::<TB, 4>::ones([1, 2, 2, 2], &device);
        let c = Tensor::<TB, 4>::zeros([1, 2, 2, 2], &device);

        assert_close(blend(t.clone(), c.clone(), 1.0), t.clone(), 1e-6);
        assert_close(blend(t.clone(), c.clone(), 0.0), c.clone(), 1e-6);
        assert_close(blend(t.clone(), c.clone(), 7.0), t.clone(), 1e-6);
        assert_close(blend(t, c, 0.25), Tensor::full([1, 2, 2, 2], 0.25, &device), 1e-6);
    }

    #[test]
    fn test_gram_matrix_values() {
        let device = Default::default();
        // Two channels over two positions: [[1, 2], [3, 4]]
        let x = Tensor::<TB, 4>::from_data(
            TensorData::new(vec![1.0f32, 2.0, 3.0, 4.0], [1, 2, 1, 2]),
            &device,
        );
        let g = gram_matrix(x);
        assert_eq!(g.dims(), [1, 2, 2]);

        let values = g.into_data().to_vec::<f32>().unwrap();
        // [[1+4, 3+8], [3+8, 9+16]] / 4
        let expected = [5.0 / 4.0, 11.0 / 4.0, 11.0 / 4.0, 25.0 / 4.0];
        for (v, e) in values.iter().zip(expected) {
            assert!((v - e).abs() < 1e-6);
        }
    }
}
