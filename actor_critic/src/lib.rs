//! # Actor-Critic: Alternating Value/Policy Training on Burn
//!
//! Training core for actor-critic reinforcement learning. A value model is
//! regressed on recorded returns; its estimates turn trajectory slices into
//! advantages; a policy model is then optimized with an A2C, PPO or AWR loss.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    ActorCriticTrainer                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │   TrajectorySource (task)                                    │
//! │      │                          │                            │
//! │      ▼ value batches            ▼ policy slices (+td)        │
//! │  ┌──────────────┐  weights  ┌────────────────┐               │
//! │  │ ValueTrainer │──────────▶│ eval value net │──▶ advantages │
//! │  └──────┬───────┘           └────────────────┘        │      │
//! │         │ shared layers [0, n)                        ▼      │
//! │         └──────── copy ◀──────▶ copy ──────── PolicyTrainer  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both subtrainers are [`ModuleTrainer`]s: burn's Adam with a per-layer view
//! of its moments, a learning-rate schedule and metrics loggers around a burn
//! module implementing [`SequenceModel`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use actor_critic::{AWRTrainer, AWR, AWRConfig, ActorCriticConfig, Categorical};
//!
//! let config = ActorCriticConfig::default()
//!     .with_max_slice_length(16)
//!     .with_added_policy_slice_length(4)
//!     .with_n_shared_layers(1)
//!     .with_output_dir("runs/awr");
//!
//! let mut trainer: AWRTrainer<B, _, _, _, _> = AWRTrainer::new(
//!     task,
//!     |device| ValueNet::new(device),
//!     PolicyNet::new(&device),
//!     AWR::new(Categorical::new(n_actions), AWRConfig::default()),
//!     config,
//!     &device,
//! )?;
//! trainer.run(100)?;
//! ```

pub mod algorithms;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod scheduling;
pub mod trainer;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use algorithms::{
    calculate_advantage, A2CLoss, AWRLoss, Categorical, Gaussian, PPOLoss, PolicyDistribution,
    PolicyLoss,
};
pub use config::{AWRConfig, ActorCriticConfig, PPOConfig};
pub use crate::core::{
    BatchRequest, EpochScope, LayerWeights, ModelWeights, OptimizerState, PolicyBatch,
    TrajectoryBatch, TrajectorySource, ValueBatch,
};
pub use engine::{
    AdamConfig, LayeredModule, ModuleTrainer, PolicyObjective, SequenceModel, SubTrainer,
    ValueObjective,
};
pub use error::{Result, TrainerError};
pub use metrics::{CSVLogger, EpochSummary, LogLogger, MetricsLogger, StepRecord};
pub use scheduling::{LRScheduler, MultifactorSchedule, ScheduleConfig};
pub use trainer::{
    copy_model_weights, A2CTrainer, A2C, AWRTrainer, AWR, ActorCriticAlgorithm, ActorCriticEpoch,
    ActorCriticTrainer, PPOTrainer, PPO,
};
