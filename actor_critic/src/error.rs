//! Error type shared by the whole training core.
//!
//! Every failure is fatal to the current epoch: errors propagate with `?` up to
//! the caller of [`train_epoch`](crate::trainer::ActorCriticTrainer::train_epoch)
//! and nothing is retried locally.

use std::io;

/// Errors raised while building batches, training, or sharing weights.
#[derive(Debug, thiserror::Error)]
pub enum TrainerError {
    /// An operation that a concrete algorithm must provide was not overridden.
    #[error("operation `{0}` is not implemented for this algorithm")]
    NotImplemented(&'static str),

    /// A tensor or weight block did not have the shape the contract requires.
    #[error("shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A layer range that does not fit inside a weight sequence.
    #[error("layer range {start}..{end} out of bounds for {len} layers")]
    LayerRange { start: usize, end: usize, len: usize },

    /// An input stream stopped producing batches.
    #[error("input stream `{0}` is exhausted")]
    StreamExhausted(String),

    /// Tensor data could not be converted.
    #[error("tensor data error: {0}")]
    Tensor(String),

    /// The trajectory source reported a failure.
    #[error("task error: {0}")]
    Task(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, TrainerError>;

/// Fail with [`TrainerError::ShapeMismatch`] unless `actual == expected`.
pub fn ensure_shape(what: &str, actual: &[usize], expected: &[usize]) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(TrainerError::ShapeMismatch {
            what: what.to_string(),
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        })
    }
}
