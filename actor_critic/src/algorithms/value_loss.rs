//! Weighted L2 regression loss for the value model.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Smallest total weight used as denominator, so an all-padding batch gives 0.
const MIN_TOTAL_WEIGHT: f32 = 1e-8;

/// Weighted mean squared error: `Σ w (y - t)² / Σ w`.
///
/// With the trajectory mask as `weights`, padded timesteps contribute nothing
/// to the loss or its gradient.
pub fn weighted_l2_loss<B: Backend, const D: usize>(
    predictions: Tensor<B, D>,
    targets: Tensor<B, D>,
    weights: Tensor<B, D>,
) -> Tensor<B, 1> {
    let squared = (predictions - targets).powf_scalar(2.0);
    let total_weight = weights.clone().sum().clamp_min(MIN_TOTAL_WEIGHT);
    (squared * weights).sum() / total_weight
}

/// Scalar version of [`weighted_l2_loss`].
pub fn weighted_l2_loss_scalar(predictions: &[f32], targets: &[f32], weights: &[f32]) -> f32 {
    assert_eq!(predictions.len(), targets.len());
    assert_eq!(predictions.len(), weights.len());

    let total_weight: f32 = weights.iter().sum();
    let weighted: f32 = predictions
        .iter()
        .zip(targets)
        .zip(weights)
        .map(|((y, t), w)| w * (y - t).powi(2))
        .sum();
    weighted / total_weight.max(MIN_TOTAL_WEIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tensor::{from_vec_f32, to_vec_f32};
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_scalar_ignores_zero_weight() {
        let loss = weighted_l2_loss_scalar(&[1.0, 5.0], &[2.0, 0.0], &[1.0, 0.0]);
        assert!((loss - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_all_padding_gives_zero() {
        let loss = weighted_l2_loss_scalar(&[1.0, 5.0], &[2.0, 0.0], &[0.0, 0.0]);
        assert_eq!(loss, 0.0);
    }

    #[test]
    fn test_tensor_matches_scalar() {
        let device = Default::default();
        let predictions = vec![0.5, 1.0, 2.0, -1.0];
        let targets = vec![1.0, 1.0, 0.0, 0.0];
        let weights = vec![1.0, 1.0, 1.0, 0.0];

        let expected = weighted_l2_loss_scalar(&predictions, &targets, &weights);
        let loss = weighted_l2_loss(
            from_vec_f32::<TestBackend, 3>(predictions, [2, 2, 1], &device).unwrap(),
            from_vec_f32::<TestBackend, 3>(targets, [2, 2, 1], &device).unwrap(),
            from_vec_f32::<TestBackend, 3>(weights, [2, 2, 1], &device).unwrap(),
        );

        assert_eq!(loss.dims(), [1]);
        let got = to_vec_f32(loss).unwrap()[0];
        assert!((got - expected).abs() < 1e-6);
    }
}
