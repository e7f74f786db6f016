//! Policy distributions over actions, parameterized by policy model outputs.
//!
//! A policy model maps observations `[B, L, obs_dim]` to distribution inputs
//! `[B, L, n_inputs]`; the distribution turns those into per-timestep
//! log-probabilities of the taken actions.
//!
//! - [`Categorical`]: logits over N discrete actions (action stored as index)
//! - [`Gaussian`]: diagonal Gaussian with fixed std, inputs are the mean

use burn::tensor::activation::log_softmax;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Log-probability of actions under a parameterized distribution.
pub trait PolicyDistribution<B: Backend>: Clone {
    /// Depth of the distribution inputs the policy model must produce.
    fn n_inputs(&self) -> usize;

    /// Log-probabilities `[B, L]` of `actions` under `dist_inputs`.
    ///
    /// * `dist_inputs` - `[B, L, n_inputs]`
    /// * `actions` - `[B, L, action_dim]`
    fn log_prob(&self, dist_inputs: Tensor<B, 3>, actions: Tensor<B, 3>) -> Tensor<B, 2>;
}

/// Categorical distribution over `n_categories` discrete actions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Categorical {
    pub n_categories: usize,
}

impl Categorical {
    pub fn new(n_categories: usize) -> Self {
        Self { n_categories }
    }
}

impl<B: Backend> PolicyDistribution<B> for Categorical {
    fn n_inputs(&self) -> usize {
        self.n_categories
    }

    fn log_prob(&self, dist_inputs: Tensor<B, 3>, actions: Tensor<B, 3>) -> Tensor<B, 2> {
        let [b, l, _] = dist_inputs.dims();
        let log_probs = log_softmax(dist_inputs, 2);
        let indices = actions.int();
        log_probs.gather(2, indices).reshape([b, l])
    }
}

/// Diagonal Gaussian with mean from the model and a fixed standard deviation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gaussian {
    pub action_dim: usize,
    pub std: f32,
}

impl Gaussian {
    pub fn new(action_dim: usize, std: f32) -> Self {
        Self { action_dim, std }
    }
}

impl<B: Backend> PolicyDistribution<B> for Gaussian {
    fn n_inputs(&self) -> usize {
        self.action_dim
    }

    fn log_prob(&self, dist_inputs: Tensor<B, 3>, actions: Tensor<B, 3>) -> Tensor<B, 2> {
        let [b, l, _] = dist_inputs.dims();
        let log_norm = self.std.ln() + 0.5 * (2.0 * std::f32::consts::PI).ln();
        let normalized = (actions - dist_inputs).div_scalar(self.std);
        let per_dim = normalized.powf_scalar(2.0).mul_scalar(-0.5).sub_scalar(log_norm);
        per_dim.sum_dim(2).reshape([b, l])
    }
}
