//! Actor-critic trainers.
//!
//! - [`ActorCriticTrainer`]: orchestrates the value and policy subtrainers
//! - [`ActorCriticAlgorithm`]: extension point for concrete algorithms
//! - [`A2C`], [`PPO`], [`AWR`]: the algorithms, with trainer aliases
//! - [`copy_model_weights`]: shares a prefix of layers between subtrainers

pub mod a2c;
pub mod actor_critic;
pub mod awr;
pub mod ppo;
pub mod sharing;


pub use a2c::{a2c_policy_inputs, A2CTrainer, A2C};
pub use actor_critic::{
    ActorCriticAlgorithm, ActorCriticEpoch, ActorCriticTrainer, PolicyTrainer, ValueTrainer,
};
pub use awr::{AWRTrainer, AWR};
pub use ppo::{PPOTrainer, PPO};
pub use sharing::copy_model_weights;
