//! Supervised-style inputs derived from trajectory batches.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::error::{ensure_shape, Result};

/// Value regression inputs: `(observations, targets, mask)`.
///
/// Targets and mask carry a trailing depth-1 axis so they line up with the
/// `[B, L, 1]` output of a value model.
#[derive(Debug, Clone)]
pub struct ValueBatch<B: Backend> {
    /// `[B, L, obs_dim]`
    pub observations: Tensor<B, 3>,
    /// Returns, `[B, L, 1]`
    pub targets: Tensor<B, 3>,
    /// Per-sample weights, `[B, L, 1]`
    pub mask: Tensor<B, 3>,
}

/// Policy inputs: `(observations, actions, advantages, old_log_probs)`.
///
/// Every component shares the `[B, L]` leading dims of `advantages`.
#[derive(Debug, Clone)]
pub struct PolicyBatch<B: Backend> {
    /// `[B, L, obs_dim]`
    pub observations: Tensor<B, 3>,
    /// `[B, L, action_dim]`
    pub actions: Tensor<B, 3>,
    /// `[B, L]`
    pub advantages: Tensor<B, 2>,
    /// `[B, L]`
    pub old_log_probs: Tensor<B, 2>,
}

impl<B: Backend> PolicyBatch<B> {
    /// Check that all components agree with the advantages' `[B, L]`.
    pub fn validate(&self) -> Result<()> {
        let lead = self.advantages.dims();
        let [b, l, _] = self.observations.dims();
        ensure_shape("policy observations", &[b, l], &lead)?;
        let [b, l, _] = self.actions.dims();
        ensure_shape("policy actions", &[b, l], &lead)?;
        ensure_shape("policy old_log_probs", &self.old_log_probs.dims(), &lead)?;
        Ok(())
    }

    /// Old log-probs with the trailing depth axis the policy losses expect.
    pub fn old_log_probs_with_depth(&self) -> Tensor<B, 3> {
        let [b, l] = self.old_log_probs.dims();
        self.old_log_probs.clone().reshape([b, l, 1])
    }
}
