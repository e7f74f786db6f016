//! Trajectory batches and the task interface that produces them.
//!
//! A [`TrajectoryBatch`] holds `B` trajectory slices of (padded) length `L`:
//!
//! ```text
//! observations  [B, L, obs_dim]
//! actions       [B, L, action_dim]   (discrete: action_dim = 1, float index)
//! rewards       [B, L]
//! returns       [B, L]
//! log_probs     [B, L]               log π_old(a_t | s_t) under the sampler
//! mask          [B, L]               1.0 on real timesteps, 0.0 on padding
//! ```
//!
//! Batches are produced on demand by the external task, one per training step,
//! and are never stored by this crate.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::error::{ensure_shape, Result};

/// Which recorded epochs the task may sample slices from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochScope {
    /// Only the most recent epoch (on-policy algorithms).
    Latest,
    /// Every recorded epoch (off-policy algorithms).
    All,
}

impl EpochScope {
    /// Scope used by an algorithm with the given on-policy flag.
    pub fn for_on_policy(on_policy: bool) -> Self {
        if on_policy {
            EpochScope::Latest
        } else {
            EpochScope::All
        }
    }
}

/// Parameters of a single call into the task's batch sampler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub batch_size: usize,
    pub epochs: EpochScope,
    pub max_slice_length: usize,
    /// Whether slices may end on the final (action-less) state, which
    /// TD advantages need as look-ahead.
    pub include_final_state: bool,
}

/// A batch of fixed-length trajectory slices.
#[derive(Debug, Clone)]
pub struct TrajectoryBatch<B: Backend> {
    pub observations: Tensor<B, 3>,
    pub actions: Tensor<B, 3>,
    pub rewards: Tensor<B, 2>,
    pub returns: Tensor<B, 2>,
    pub log_probs: Tensor<B, 2>,
    pub mask: Tensor<B, 2>,
}

impl<B: Backend> TrajectoryBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.rewards.dims()[0]
    }

    pub fn length(&self) -> usize {
        self.rewards.dims()[1]
    }

    pub fn device(&self) -> B::Device {
        self.rewards.device()
    }

    /// Check that every per-timestep field shares the `[B, L]` leading dims.
    pub fn validate(&self) -> Result<()> {
        let lead = self.rewards.dims();
        let [b, l, _] = self.observations.dims();
        ensure_shape("trajectory observations", &[b, l], &lead)?;
        let [b, l, _] = self.actions.dims();
        ensure_shape("trajectory actions", &[b, l], &lead)?;
        ensure_shape("trajectory returns", &self.returns.dims(), &lead)?;
        ensure_shape("trajectory log_probs", &self.log_probs.dims(), &lead)?;
        ensure_shape("trajectory mask", &self.mask.dims(), &lead)?;
        Ok(())
    }
}

/// The environment-abstraction task that samples trajectory batches.
///
/// Implementations own the recorded trajectories; this crate only pulls
/// batches from them.
pub trait TrajectorySource<B: Backend> {
    /// Sample one batch matching `request`.
    fn trajectory_batch(&mut self, request: &BatchRequest) -> Result<TrajectoryBatch<B>>;

    /// Discount factor γ used for returns and advantages.
    fn gamma(&self) -> f32;

    /// Called by [`ActorCriticTrainer::run`](crate::trainer::ActorCriticTrainer::run)
    /// after each epoch, so the task can collect fresh trajectories.
    fn end_epoch(&mut self, _epoch: usize) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrainerError;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn batch(b: usize, l: usize, mask_len: usize) -> TrajectoryBatch<TestBackend> {
        let device = Default::default();
        TrajectoryBatch {
            observations: Tensor::zeros([b, l, 3], &device),
            actions: Tensor::zeros([b, l, 1], &device),
            rewards: Tensor::zeros([b, l], &device),
            returns: Tensor::zeros([b, l], &device),
            log_probs: Tensor::zeros([b, l], &device),
            mask: Tensor::ones([b, mask_len], &device),
        }
    }

    #[test]
    fn test_epoch_scope_for_on_policy() {
        assert_eq!(EpochScope::for_on_policy(true), EpochScope::Latest);
        assert_eq!(EpochScope::for_on_policy(false), EpochScope::All);
    }

    #[test]
    fn test_validate_accepts_consistent_batch() {
        let batch = batch(2, 5, 5);
        assert!(batch.validate().is_ok());
        assert_eq!(batch.batch_size(), 2);
        assert_eq!(batch.length(), 5);
    }

    #[test]
    fn test_validate_rejects_short_mask() {
        let err = batch(2, 5, 4).validate().unwrap_err();
        assert!(matches!(err, TrainerError::ShapeMismatch { .. }));
    }
}
