//! Trainer and algorithm configuration.
//!
//! All configs have sensible defaults and `with_*` builders, and deserialize
//! from partial documents (missing fields take their default):
//!
//! ```ignore
//! let config = ActorCriticConfig::default()
//!     .with_max_slice_length(16)
//!     .with_n_shared_layers(1)
//!     .with_output_dir("runs/awr");
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::engine::AdamConfig;
use crate::error::{Result, TrainerError};
use crate::scheduling::ScheduleConfig;

/// Configuration of the actor-critic orchestrator and its two subtrainers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorCriticConfig {
    /// Trajectory slices per value batch.
    pub value_batch_size: usize,
    /// Value optimizer steps per epoch.
    pub value_train_steps_per_epoch: usize,
    /// Trajectory slices per policy batch.
    pub policy_batch_size: usize,
    /// Policy optimizer steps per epoch.
    pub policy_train_steps_per_epoch: usize,
    /// Leading layers kept in sync between the value and policy models.
    pub n_shared_layers: usize,
    /// Extra timesteps of policy slices, used as TD look-ahead.
    pub added_policy_slice_length: usize,
    /// Length of value slices; policy slices add `added_policy_slice_length`.
    /// Required.
    pub max_slice_length: Option<usize>,
    /// Root output directory; the value trainer writes to `<dir>/value`.
    pub output_dir: Option<PathBuf>,
    pub value_optimizer: AdamConfig,
    pub value_lr_schedule: ScheduleConfig,
    pub policy_optimizer: AdamConfig,
    pub policy_lr_schedule: ScheduleConfig,
}

impl Default for ActorCriticConfig {
    fn default() -> Self {
        Self {
            value_batch_size: 64,
            value_train_steps_per_epoch: 500,
            policy_batch_size: 64,
            policy_train_steps_per_epoch: 500,
            n_shared_layers: 0,
            added_policy_slice_length: 0,
            max_slice_length: None,
            output_dir: None,
            value_optimizer: AdamConfig::default(),
            value_lr_schedule: ScheduleConfig::default(),
            policy_optimizer: AdamConfig::default(),
            policy_lr_schedule: ScheduleConfig::default(),
        }
    }
}

impl ActorCriticConfig {
    pub fn with_value_batch_size(mut self, size: usize) -> Self {
        self.value_batch_size = size;
        self
    }

    pub fn with_value_train_steps_per_epoch(mut self, steps: usize) -> Self {
        self.value_train_steps_per_epoch = steps;
        self
    }

    pub fn with_policy_batch_size(mut self, size: usize) -> Self {
        self.policy_batch_size = size;
        self
    }

    pub fn with_policy_train_steps_per_epoch(mut self, steps: usize) -> Self {
        self.policy_train_steps_per_epoch = steps;
        self
    }

    pub fn with_n_shared_layers(mut self, n: usize) -> Self {
        self.n_shared_layers = n;
        self
    }

    pub fn with_added_policy_slice_length(mut self, length: usize) -> Self {
        self.added_policy_slice_length = length;
        self
    }

    pub fn with_max_slice_length(mut self, length: usize) -> Self {
        self.max_slice_length = Some(length);
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_value_optimizer(mut self, optimizer: AdamConfig) -> Self {
        self.value_optimizer = optimizer;
        self
    }

    pub fn with_value_lr_schedule(mut self, schedule: ScheduleConfig) -> Self {
        self.value_lr_schedule = schedule;
        self
    }

    pub fn with_policy_optimizer(mut self, optimizer: AdamConfig) -> Self {
        self.policy_optimizer = optimizer;
        self
    }

    pub fn with_policy_lr_schedule(mut self, schedule: ScheduleConfig) -> Self {
        self.policy_lr_schedule = schedule;
        self
    }

    /// The configured `max_slice_length`, or a configuration error.
    pub fn require_max_slice_length(&self) -> Result<usize> {
        self.max_slice_length
            .ok_or_else(|| TrainerError::Config("max_slice_length is required".to_string()))
    }

    /// Length of policy slices: value slice length plus the TD look-ahead.
    pub fn policy_slice_length(&self) -> Result<usize> {
        Ok(self.require_max_slice_length()? + self.added_policy_slice_length)
    }

    /// Check the model-independent settings.
    pub fn validate(&self) -> Result<()> {
        let max_slice_length = self.require_max_slice_length()?;
        if max_slice_length == 0 {
            return Err(TrainerError::Config(
                "max_slice_length must be > 0".to_string(),
            ));
        }
        if self.value_batch_size == 0 || self.policy_batch_size == 0 {
            return Err(TrainerError::Config(format!(
                "batch sizes must be > 0, got value {} and policy {}",
                self.value_batch_size, self.policy_batch_size
            )));
        }
        Ok(())
    }
}

/// PPO clipping configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PPOConfig {
    /// Clip ratio ε.
    pub epsilon: f32,
}

impl Default for PPOConfig {
    fn default() -> Self {
        Self { epsilon: 0.2 }
    }
}

impl PPOConfig {
    pub fn with_epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }
}

/// AWR weighting configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AWRConfig {
    /// Temperature β of the exponential advantage weights.
    pub beta: f32,
    /// Cap on the advantage weights.
    pub w_max: f32,
}

impl Default for AWRConfig {
    fn default() -> Self {
        Self {
            beta: 1.0,
            w_max: 20.0,
        }
    }
}

impl AWRConfig {
    pub fn with_beta(mut self, beta: f32) -> Self {
        self.beta = beta;
        self
    }

    pub fn with_w_max(mut self, w_max: f32) -> Self {
        self.w_max = w_max;
        self
    }
}
