//! Data model shared by the algorithms, the training engine and the trainer.
//!
//! - `trajectory`: trajectory batches, batch requests and the task trait
//! - `batches`: value and policy inputs built from trajectories
//! - `weights`: per-layer weights and optimizer slot state
//! - `tensor`: tensor ↔ `Vec<f32>` conversions

pub mod batches;
pub mod tensor;
pub mod trajectory;
pub mod weights;

pub use batches::{PolicyBatch, ValueBatch};
pub use trajectory::{BatchRequest, EpochScope, TrajectoryBatch, TrajectorySource};
pub use weights::{LayerWeights, ModelWeights, OptimizerState, ParamBlock, SlotGroup};
