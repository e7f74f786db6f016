//! Training objectives: what a [`ModuleTrainer`](super::ModuleTrainer)
//! minimizes for a given model and batch.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::layered::SequenceModel;
use crate::algorithms::{weighted_l2_loss, PolicyLoss};
use crate::core::{PolicyBatch, ValueBatch};
use crate::error::{ensure_shape, Result};

/// Maps a model and one batch to a scalar loss.
pub trait Objective<B: Backend, M> {
    type Batch;

    fn loss(&self, model: &M, batch: Self::Batch) -> Result<Tensor<B, 1>>;
}

/// Masked L2 regression of the value model output on the returns.
///
/// The mask acts as per-sample weights, so padded timesteps contribute zero
/// loss.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueObjective;

impl<B: Backend, M: SequenceModel<B>> Objective<B, M> for ValueObjective {
    type Batch = ValueBatch<B>;

    fn loss(&self, model: &M, batch: ValueBatch<B>) -> Result<Tensor<B, 1>> {
        let predictions = model.forward(batch.observations);
        ensure_shape(
            "value model output",
            &predictions.dims(),
            &batch.targets.dims(),
        )?;
        ensure_shape("value mask", &batch.mask.dims(), &batch.targets.dims())?;
        Ok(weighted_l2_loss(predictions, batch.targets, batch.mask))
    }
}

/// Runs the policy model and applies a bound [`PolicyLoss`].
#[derive(Debug, Clone)]
pub struct PolicyObjective<L> {
    loss: L,
}

impl<L> PolicyObjective<L> {
    pub fn new(loss: L) -> Self {
        Self { loss }
    }

    pub fn policy_loss(&self) -> &L {
        &self.loss
    }
}

impl<B: Backend, M: SequenceModel<B>, L: PolicyLoss<B>> Objective<B, M> for PolicyObjective<L> {
    type Batch = PolicyBatch<B>;

    fn loss(&self, model: &M, batch: PolicyBatch<B>) -> Result<Tensor<B, 1>> {
        batch.validate()?;
        let old_log_probs = batch.old_log_probs_with_depth();
        let dist_inputs = model.forward(batch.observations);
        let [b, l, _] = dist_inputs.dims();
        ensure_shape("policy model output", &[b, l], &batch.advantages.dims())?;
        Ok(self
            .loss
            .loss(dist_inputs, batch.actions, batch.advantages, old_log_probs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{A2CLoss, Categorical};
    use crate::core::tensor::{from_vec_f32, to_vec_f32};
    use crate::error::TrainerError;
    use crate::testing::{TestBackend, TwoLayerNet};

    #[test]
    fn test_value_objective_ignores_masked_steps() {
        let device = Default::default();
        let net = TwoLayerNet::<TestBackend>::new(2, 4, 1, &device);
        let observations = Tensor::<TestBackend, 3>::ones([1, 2, 2], &device);
        let prediction = to_vec_f32(net.forward(observations.clone())).unwrap();

        // Second timestep has a wild target but zero weight.
        let targets =
            from_vec_f32::<TestBackend, 3>(vec![prediction[0], 1e6], [1, 2, 1], &device).unwrap();
        let mask = from_vec_f32::<TestBackend, 3>(vec![1.0, 0.0], [1, 2, 1], &device).unwrap();

        let loss = ValueObjective
            .loss(
                &net,
                ValueBatch {
                    observations,
                    targets,
                    mask,
                },
            )
            .unwrap();
        let loss = loss.into_scalar();
        assert!(loss.abs() < 1e-6);
    }

    #[test]
    fn test_value_objective_checks_output_shape() {
        let device = Default::default();
        let net = TwoLayerNet::<TestBackend>::new(2, 4, 3, &device);
        let batch = ValueBatch {
            observations: Tensor::zeros([2, 5, 2], &device),
            targets: Tensor::zeros([2, 5, 1], &device),
            mask: Tensor::ones([2, 5, 1], &device),
        };

        let err = ValueObjective.loss(&net, batch).unwrap_err();
        assert!(matches!(err, TrainerError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_policy_objective_produces_scalar() {
        let device = Default::default();
        let net = TwoLayerNet::<TestBackend>::new(2, 4, 3, &device);
        let objective = PolicyObjective::new(A2CLoss::new(Categorical::new(3)));
        let batch = PolicyBatch {
            observations: Tensor::ones([2, 4, 2], &device),
            actions: Tensor::zeros([2, 4, 1], &device),
            advantages: Tensor::ones([2, 4], &device),
            old_log_probs: Tensor::zeros([2, 4], &device),
        };

        let loss = objective.loss(&net, batch).unwrap();
        assert_eq!(loss.dims(), [1]);
        // Advantage 1 everywhere: loss is the mean negative log-likelihood.
        assert!(loss.into_scalar() > 0.0);
    }
}
