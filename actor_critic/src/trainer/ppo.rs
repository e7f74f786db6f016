//! Proximal policy optimization on top of the A2C inputs.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::a2c::a2c_policy_inputs;
use super::actor_critic::{ActorCriticAlgorithm, ActorCriticTrainer};
use crate::algorithms::{PPOLoss, PolicyDistribution};
use crate::config::PPOConfig;
use crate::core::{PolicyBatch, TrajectoryBatch};
use crate::error::Result;

/// PPO: on-policy, clipped probability-ratio objective.
#[derive(Debug, Clone)]
pub struct PPO<D> {
    distribution: D,
    config: PPOConfig,
}

impl<D> PPO<D> {
    pub fn new(distribution: D, config: PPOConfig) -> Self {
        Self {
            distribution,
            config,
        }
    }

    pub fn config(&self) -> &PPOConfig {
        &self.config
    }
}

impl<B: Backend, D: PolicyDistribution<B>> ActorCriticAlgorithm<B> for PPO<D> {
    type Loss = PPOLoss<D>;

    fn name(&self) -> &'static str {
        "PPO"
    }

    fn on_policy(&self) -> bool {
        true
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

    fn policy_loss(&self) -> PPOLoss<D> {
        PPOLoss::new(self.distribution.clone(), self.config.epsilon)
    }
}

/// Actor-critic trainer running PPO.
pub type PPOTrainer<B, T, V, P, D> = ActorCriticTrainer<B, T, V, P, PPO<D>>;
