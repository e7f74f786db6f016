//! Advantage-weighted regression.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::a2c::a2c_policy_inputs;
use super::actor_critic::{ActorCriticAlgorithm, ActorCriticTrainer};
use crate::algorithms::{AWRLoss, PolicyDistribution};
use crate::config::AWRConfig;
use crate::core::{PolicyBatch, TrajectoryBatch};
use crate::error::Result;

/// AWR: off-policy, samples from every recorded epoch and weights
/// log-likelihoods by `min(exp(A / β), w_max)`.
#[derive(Debug, Clone)]
pub struct AWR<D> {
    distribution: D,
    config: AWRConfig,
}

impl<D> AWR<D> {
    pub fn new(distribution: D, config: AWRConfig) -> Self {
        Self {
            distribution,
            config,
        }
    }

    pub fn config(&self) -> &AWRConfig {
        &self.config
    }
}

impl<B: Backend, D: PolicyDistribution<B>> ActorCriticAlgorithm<B> for AWR<D> {
    type Loss = AWRLoss<D>;

    fn name(&self) -> &'static str {
        "AWR"
    }

    fn on_policy(&self) -> bool {
        false
    }

    fn policy_inputs(
        &self,
        trajectory: &TrajectoryBatch<B>,
        values: Tensor<B, 2>,
        gamma: f32,
        td: usize,
    ) -> Result<PolicyBatch<B>> {
        a2c_policy_inputs(trajectory, values, gamma, td)
    }

    fn policy_loss(&self) -> AWRLoss<D> {
        AWRLoss::new(self.distribution.clone(), self.config.beta, self.config.w_max)
    }
}

/// Actor-critic trainer running AWR.
pub type AWRTrainer<B, T, V, P, D> = ActorCriticTrainer<B, T, V, P, AWR<D>>;
