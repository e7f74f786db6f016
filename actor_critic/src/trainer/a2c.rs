//! Advantage actor-critic.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::actor_critic::{ActorCriticAlgorithm, ActorCriticTrainer};
use crate::algorithms::{calculate_advantage, A2CLoss, PolicyDistribution};
use crate::core::{PolicyBatch, TrajectoryBatch};
use crate::error::Result;

/// Policy inputs shared by A2C, PPO and AWR.
///
/// Advantages are computed with TD horizon `td`; observations, actions and
/// old log-probs are then cut by `td` timesteps at the end so all four
/// components share the advantages' `[B, L - td]` leading dims.
pub fn a2c_policy_inputs<B: Backend>(
    trajectory: &TrajectoryBatch<B>,
    values: Tensor<B, 2>,
    gamma: f32,
    td: usize,
) -> Result<PolicyBatch<B>> {
    let advantages = calculate_advantage(
        trajectory.rewards.clone(),
        trajectory.returns.clone(),
        values,
        gamma,
        td,
    )?;
    let [b, keep] = advantages.dims();
    let [_, _, obs_dim] = trajectory.observations.dims();
    let [_, _, action_dim] = trajectory.actions.dims();

    let batch = PolicyBatch {
        observations: trajectory
            .observations
            .clone()
            .slice([0..b, 0..keep, 0..obs_dim]),
        actions: trajectory.actions.clone().slice([0..b, 0..keep, 0..action_dim]),
        advantages,
        old_log_probs: trajectory.log_probs.clone().slice([0..b, 0..keep]),
    };
    batch.validate()?;
    Ok(batch)
}

/// A2C: on-policy, loss `-mean(log π(a|s) · A)`.
#[derive(Debug, Clone)]
pub struct A2C<D> {
    distribution: D,
}

impl<D> A2C<D> {
    pub fn new(distribution: D) -> Self {
        Self { distribution }
    }

    pub fn distribution(&self) -> &D {
        &self.distribution
    }
}

impl<B: Backend, D: PolicyDistribution<B>> ActorCriticAlgorithm<B> for A2C<D> {
    type Loss = A2CLoss<D>;

    fn name(&self) -> &'static str {
        "A2C"
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

    fn policy_loss(&self) -> A2CLoss<D> {
        A2CLoss::new(self.distribution.clone())
    }
}

/// Actor-critic trainer running A2C.
pub type A2CTrainer<B, T, V, P, D> = ActorCriticTrainer<B, T, V, P, A2C<D>>;
