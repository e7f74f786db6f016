//! Policy gradient losses for A2C, PPO and AWR.
//!
//! All three share one input contract:
//!
//! ```text
//! dist_inputs    [B, L, n_inputs]   policy model output
//! actions        [B, L, action_dim]
//! advantages     [B, L]
//! old_log_probs  [B, L, 1]          log π_old(a|s), trailing depth axis
//! ```
//!
//! and return the scalar loss (mean over batch and time) as a `[1]` tensor.
//! Padding is removed upstream by slicing, not by the loss.
//!
//! | Loss | Objective maximized |
//! |------|---------------------|
//! | A2C  | log π(a\|s) · A |
//! | PPO  | min(r · A, clip(r, 1-ε, 1+ε) · A), r = π/π_old |
//! | AWR  | log π(a\|s) · min(exp(A/β), w_max) |
//!
//! Slice versions (`*_loss_scalar`) compute the same values from
//! precomputed log-probabilities, for diagnostics.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::distribution::PolicyDistribution;

/// A policy loss bound to its configuration.
pub trait PolicyLoss<B: Backend>: Clone {
    /// Algorithm name for logging.
    fn name(&self) -> &'static str;

    /// Compute the scalar loss for one policy batch.
    fn loss(
        &self,
        dist_inputs: Tensor<B, 3>,
        actions: Tensor<B, 3>,
        advantages: Tensor<B, 2>,
        old_log_probs: Tensor<B, 3>,
    ) -> Tensor<B, 1>;
}

// ============================================================================
// A2C
// ============================================================================

/// Advantage actor-critic loss: `-mean(log π(a|s) · A)`.
#[derive(Debug, Clone)]
pub struct A2CLoss<D> {
    distribution: D,
}

impl<D> A2CLoss<D> {
    pub fn new(distribution: D) -> Self {
        Self { distribution }
    }
}

impl<B: Backend, D: PolicyDistribution<B>> PolicyLoss<B> for A2CLoss<D> {
    fn name(&self) -> &'static str {
        "A2C"
    }

    fn loss(
        &self,
        dist_inputs: Tensor<B, 3>,
        actions: Tensor<B, 3>,
        advantages: Tensor<B, 2>,
        _old_log_probs: Tensor<B, 3>,
    ) -> Tensor<B, 1> {
        let log_probs = self.distribution.log_prob(dist_inputs, actions);
        -(log_probs * advantages).mean()
    }
}

// ============================================================================
// PPO
// ============================================================================

/// PPO clipped surrogate loss.
///
/// L = -mean(min(r · A, clip(r, 1-ε, 1+ε) · A)),  r = exp(log π - log π_old)
#[derive(Debug, Clone)]
pub struct PPOLoss<D> {
    distribution: D,
    epsilon: f32,
}

impl<D> PPOLoss<D> {
    pub fn new(distribution: D, epsilon: f32) -> Self {
        Self {
            distribution,
            epsilon,
        }
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }
}

impl<B: Backend, D: PolicyDistribution<B>> PolicyLoss<B> for PPOLoss<D> {
    fn name(&self) -> &'static str {
        "PPO"
    }

    fn loss(
        &self,
        dist_inputs: Tensor<B, 3>,
        actions: Tensor<B, 3>,
        advantages: Tensor<B, 2>,
        old_log_probs: Tensor<B, 3>,
    ) -> Tensor<B, 1> {
        let new_log_probs = self.distribution.log_prob(dist_inputs, actions);

        // Drop the trailing depth axis.
        let [b, l, _] = old_log_probs.dims();
        let old_log_probs: Tensor<B, 2> = old_log_probs.reshape([b, l]);

        let ratio = (new_log_probs - old_log_probs).exp();
        let unclipped = ratio.clone() * advantages.clone();
        let clipped = ratio.clamp(1.0 - self.epsilon, 1.0 + self.epsilon) * advantages;

        -unclipped.min_pair(clipped).mean()
    }
}

// ============================================================================
// AWR
// ============================================================================

/// Advantage-weighted regression loss.
///
/// L = -mean(log π(a|s) · min(exp(A / β), w_max))
#[derive(Debug, Clone)]
pub struct AWRLoss<D> {
    distribution: D,
    beta: f32,
    w_max: f32,
}

impl<D> AWRLoss<D> {
    pub fn new(distribution: D, beta: f32, w_max: f32) -> Self {
        Self {
            distribution,
            beta,
            w_max,
        }
    }

    pub fn beta(&self) -> f32 {
        self.beta
    }

    pub fn w_max(&self) -> f32 {
        self.w_max
    }
}

impl<B: Backend, D: PolicyDistribution<B>> PolicyLoss<B> for AWRLoss<D> {
    fn name(&self) -> &'static str {
        "AWR"
    }

    fn loss(
        &self,
        dist_inputs: Tensor<B, 3>,
        actions: Tensor<B, 3>,
        advantages: Tensor<B, 2>,
        _old_log_probs: Tensor<B, 3>,
    ) -> Tensor<B, 1> {
        let log_probs = self.distribution.log_prob(dist_inputs, actions);
        let weights = advantages.div_scalar(self.beta).exp().clamp_max(self.w_max);
        -(log_probs * weights).mean()
    }
}

// ============================================================================
// Scalar versions
// ============================================================================

fn mean(values: impl Iterator<Item = f32>, n: usize) -> f32 {
    if n == 0 {
        return 0.0;
    }
    values.sum::<f32>() / n as f32
}

/// A2C loss from precomputed log-probabilities.
pub fn a2c_loss_scalar(log_probs: &[f32], advantages: &[f32]) -> f32 {
    assert_eq!(log_probs.len(), advantages.len());
    -mean(
        log_probs.iter().zip(advantages).map(|(lp, a)| lp * a),
        log_probs.len(),
    )
}

/// PPO clipped loss from precomputed log-probabilities.
pub fn ppo_loss_scalar(
    log_probs: &[f32],
    old_log_probs: &[f32],
    advantages: &[f32],
    epsilon: f32,
) -> f32 {
    let n = log_probs.len();
    assert_eq!(old_log_probs.len(), n);
    assert_eq!(advantages.len(), n);

    let objective = (0..n).map(|i| {
        let ratio = (log_probs[i] - old_log_probs[i]).exp();
        let clipped = ratio.clamp(1.0 - epsilon, 1.0 + epsilon);
        (ratio * advantages[i]).min(clipped * advantages[i])
    });
    -mean(objective, n)
}

/// AWR loss from precomputed log-probabilities.
pub fn awr_loss_scalar(log_probs: &[f32], advantages: &[f32], beta: f32, w_max: f32) -> f32 {
    assert_eq!(log_probs.len(), advantages.len());
    -mean(
        log_probs
            .iter()
            .zip(advantages)
            .map(|(lp, a)| lp * (a / beta).exp().min(w_max)),
        log_probs.len(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a2c_loss_scalar() {
        let loss = a2c_loss_scalar(&[-0.5, -1.0], &[1.0, 2.0]);
        // -((-0.5 * 1) + (-1 * 2)) / 2 = 1.25
        assert!((loss - 1.25).abs() < 1e-6);
    }

    #[test]
    fn test_ppo_loss_scalar_unit_ratio_is_negative_mean_advantage() {
        let log_probs = [-1.0, -0.3, -2.0];
        let advantages = [1.0, -2.0, 0.5];
        let loss = ppo_loss_scalar(&log_probs, &log_probs, &advantages, 0.2);
        let mean_adv = advantages.iter().sum::<f32>() / 3.0;
        assert!((loss + mean_adv).abs() < 1e-6);
    }

    #[test]
    fn test_ppo_loss_scalar_clips_large_ratio() {
        // ratio = e ≈ 2.718, clipped to 1.2 for positive advantage
        let loss = ppo_loss_scalar(&[0.0], &[-1.0], &[1.0], 0.2);
        assert!((loss + 1.2).abs() < 1e-5);
    }

    #[test]
    fn test_ppo_loss_scalar_negative_advantage_takes_unclipped() {
        // ratio = e, A = -1: min(-e, -1.2) = -e
        let loss = ppo_loss_scalar(&[0.0], &[-1.0], &[-1.0], 0.2);
        assert!((loss - std::f32::consts::E).abs() < 1e-5);
    }

    #[test]
    fn test_awr_weights_capped() {
        // exp(10) > w_max = 20, so the weight is 20
        let loss = awr_loss_scalar(&[-1.0], &[10.0], 1.0, 20.0);
        assert!((loss - 20.0).abs() < 1e-5);
    }

    #[test]
    fn test_awr_approaches_a2c_with_unit_advantage_weights() {
        let log_probs = [-0.7, -1.3, -0.2];
        let advantages = [0.5, -1.5, 2.0];
        // With A2C, advantages act as weights; compare to unit weights.
        let unit_weighted = a2c_loss_scalar(&log_probs, &[1.0, 1.0, 1.0]);
        let awr = awr_loss_scalar(&log_probs, &advantages, 1e6, 20.0);
        assert!((awr - unit_weighted).abs() < 1e-4);
    }
}
