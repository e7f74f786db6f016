//! Algorithm components for actor-critic training.
//!
//! - `advantage`: TD advantage estimation for policy batches
//! - `distribution`: policy distributions supplying `log_prob`
//! - `policy_loss`: A2C, PPO and AWR policy losses
//! - `value_loss`: masked L2 regression for the value model

pub mod advantage;
pub mod distribution;
pub mod policy_loss;
pub mod value_loss;

#[cfg(test)]
mod tests;

pub use advantage::{advantage_row, calculate_advantage};
pub use distribution::{Categorical, Gaussian, PolicyDistribution};
pub use policy_loss::{
    a2c_loss_scalar, awr_loss_scalar, ppo_loss_scalar, A2CLoss, AWRLoss, PPOLoss, PolicyLoss,
};
pub use value_loss::{weighted_l2_loss, weighted_l2_loss_scalar};
