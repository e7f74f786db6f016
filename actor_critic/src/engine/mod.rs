//! Training engine used by both subtrainers.
//!
//! The orchestrator only talks to the [`SubTrainer`] trait; [`ModuleTrainer`]
//! is its burn implementation:
//!
//! ```text
//! InputStream ──batch──▶ Objective(model, batch) ──loss──▶ backward()
//!                                                         │
//!                model ◀── LayerAdam::step(model, grads) ◀┘
//! ```

pub mod adam;
pub mod layered;
pub mod module_trainer;
pub mod objective;

pub use adam::{AdamConfig, LayerAdam, MODEL_SLOT_GROUP};
pub use layered::{LayeredModule, SequenceModel};
pub use module_trainer::{ModuleTrainer, METRICS_FILE};
pub use objective::{Objective, PolicyObjective, ValueObjective};

use crate::core::{ModelWeights, OptimizerState};
use crate::error::Result;
use crate::metrics::EpochSummary;

/// Lazy, unbounded sequence of training batches.
pub type BatchStream<T> = Box<dyn Iterator<Item = Result<T>>>;

/// Creates the batch stream for a given epoch index.
pub type InputStream<T> = Box<dyn FnMut(usize) -> BatchStream<T>>;

/// A training loop owning one model and its optimizer state.
pub trait SubTrainer {
    /// Run `n_epochs` epochs of `n_steps` optimizer steps each.
    fn train_epoch(&mut self, n_steps: usize, n_epochs: usize) -> Result<EpochSummary>;

    /// Snapshot of the current model weights.
    fn model_weights(&self) -> Result<ModelWeights>;

    /// Overwrite the model weights; shapes must match the model.
    fn set_model_weights(&mut self, weights: &ModelWeights) -> Result<()>;

    /// Snapshot of the optimizer state, laid out per model layer.
    fn optimizer_state(&self) -> Result<OptimizerState>;

    /// Overwrite the optimizer state; its layout must match the model.
    fn set_optimizer_state(&mut self, state: OptimizerState) -> Result<()>;
}
