//! Copying a prefix of layers between two subtrainers.

use crate::engine::{SubTrainer, MODEL_SLOT_GROUP};
use crate::error::{Result, TrainerError};

/// Copy layers `[start, end)` of `from`'s weights into the same layers of `to`.
///
/// With `copy_optimizer_slots`, the same layers of the model slot group of
/// the optimizer state are copied too; other slot groups and the step counter
/// of `to` are kept. Layers outside the range are untouched.
///
/// Everything is validated before `to` is modified, so on error `to` is
/// unchanged.
pub fn copy_model_weights<F, T>(
    start: usize,
    end: usize,
    from: &F,
    to: &mut T,
    copy_optimizer_slots: bool,
) -> Result<()>
where
    F: SubTrainer + ?Sized,
    T: SubTrainer + ?Sized,
{
    if start > end {
        return Err(TrainerError::LayerRange {
            start,
            end,
            len: to.model_weights()?.len(),
        });
    }

    let source = from.model_weights()?;
    let mut weights = to.model_weights()?;
    weights.replace_range(start, source.range(start..end)?)?;

    let state = if copy_optimizer_slots {
        let slots = from
            .optimizer_state()?
            .slot_range(MODEL_SLOT_GROUP, start..end)?
            .to_vec();
        Some(
            to.optimizer_state()?
                .with_slot_range(MODEL_SLOT_GROUP, start, &slots)?,
        )
    } else {
        None
    };

    to.set_model_weights(&weights)?;
    if let Some(state) = state {
        to.set_optimizer_state(state)?;
    }

    log::debug!("copied layers {start}..{end} (optimizer slots: {copy_optimizer_slots})");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LayerWeights, ModelWeights, OptimizerState, ParamBlock, ValueBatch};
    use crate::engine::{InputStream, ModuleTrainer, ValueObjective};
    use crate::metrics::EpochSummary;
    use crate::testing::{TestAutodiffBackend, TwoLayerNet};
    use burn::tensor::Tensor;

    type B = TestAutodiffBackend;

    /// Subtrainer holding plain weight values.
    struct FakeTrainer {
        weights: ModelWeights,
        state: OptimizerState,
    }

    impl FakeTrainer {
        fn new(values: &[f32], widths: &[usize], step: usize) -> Self {
            let layer = |v: f32, w: usize| {
                LayerWeights::new(vec![ParamBlock::new(vec![w], vec![v; w]).unwrap()])
            };
            let layers: Vec<LayerWeights> =
                values.iter().zip(widths).map(|(&v, &w)| layer(v, w)).collect();
            let slots: Vec<LayerWeights> = values
                .iter()
                .zip(widths)
                .map(|(&v, &w)| layer(v * 10.0, w))
                .collect();
            let aux = vec![layer(-1.0 - step as f32, 1)];
            Self {
                weights: ModelWeights::new(layers),
                state: OptimizerState::new(vec![slots, aux], step),
            }
        }
    }

    impl SubTrainer for FakeTrainer {
        fn train_epoch(&mut self, _n_steps: usize, _n_epochs: usize) -> Result<EpochSummary> {
            Ok(EpochSummary::from_records("fake", 0, &[]))
        }

        fn model_weights(&self) -> Result<ModelWeights> {
            Ok(self.weights.clone())
        }

        fn set_model_weights(&mut self, weights: &ModelWeights) -> Result<()> {
            self.weights = weights.clone();
            Ok(())
        }

        fn optimizer_state(&self) -> Result<OptimizerState> {
            Ok(self.state.clone())
        }

        fn set_optimizer_state(&mut self, state: OptimizerState) -> Result<()> {
            self.state = state;
            Ok(())
        }
    }

    #[test]
    fn test_copies_only_the_range() {
        let from = FakeTrainer::new(&[1.0, 2.0, 3.0, 4.0], &[2, 2, 2, 2], 5);
        let mut to = FakeTrainer::new(&[0.0, 0.0, 0.0, 0.0], &[2, 2, 2, 2], 9);
        let before = to.weights.clone();

        copy_model_weights(1, 3, &from, &mut to, false).unwrap();

        assert_eq!(to.weights.layer(0), before.layer(0));
        assert_eq!(to.weights.layer(1), from.weights.layer(1));
        assert_eq!(to.weights.layer(2), from.weights.layer(2));
        assert_eq!(to.weights.layer(3), before.layer(3));
    }

    #[test]
    fn test_copies_model_slots_and_keeps_the_rest() {
        let from = FakeTrainer::new(&[1.0, 2.0], &[2, 2], 5);
        let mut to = FakeTrainer::new(&[0.0, 7.0], &[2, 2], 9);
        let aux_before = to.state.group(1).unwrap().clone();
        let slot_1_before = to.state.group(0).unwrap()[1].clone();

        copy_model_weights(0, 1, &from, &mut to, true).unwrap();

        assert_eq!(to.state.group(0).unwrap()[0], from.state.group(0).unwrap()[0]);
        assert_eq!(to.state.group(0).unwrap()[1], slot_1_before);
        assert_eq!(to.state.group(1).unwrap(), &aux_before);
        assert_eq!(to.state.step(), 9);
    }

    #[test]
    fn test_without_slot_copy_state_is_untouched() {
        let from = FakeTrainer::new(&[1.0], &[2], 5);
        let mut to = FakeTrainer::new(&[0.0], &[2], 9);
        let state_before = to.state.clone();

        copy_model_weights(0, 1, &from, &mut to, false).unwrap();

        assert_eq!(to.state, state_before);
        assert_eq!(to.weights, from.weights);
    }

    #[test]
    fn test_empty_range_is_a_no_op() {
        let from = FakeTrainer::new(&[1.0], &[2], 5);
        let mut to = FakeTrainer::new(&[0.0], &[2], 9);
        let weights_before = to.weights.clone();

        copy_model_weights(0, 0, &from, &mut to, true).unwrap();

        assert_eq!(to.weights, weights_before);
    }

    #[test]
    fn test_out_of_range_leaves_destination() {
        let from = FakeTrainer::new(&[1.0, 2.0, 3.0], &[2, 2, 2], 5);
        let mut to = FakeTrainer::new(&[0.0, 0.0], &[2, 2], 9);
        let weights_before = to.weights.clone();
        let state_before = to.state.clone();

        let err = copy_model_weights(1, 3, &from, &mut to, true).unwrap_err();

        assert!(matches!(err, TrainerError::LayerRange { .. }));
        assert_eq!(to.weights, weights_before);
        assert_eq!(to.state, state_before);
    }

    #[test]
    fn test_shape_mismatch_leaves_destination() {
        let from = FakeTrainer::new(&[1.0, 2.0], &[2, 3], 5);
        let mut to = FakeTrainer::new(&[0.0, 0.0], &[2, 2], 9);
        let weights_before = to.weights.clone();

        let err = copy_model_weights(0, 2, &from, &mut to, true).unwrap_err();

        assert!(matches!(err, TrainerError::ShapeMismatch { .. }));
        assert_eq!(to.weights, weights_before);
    }

    fn value_trainer() -> ModuleTrainer<B, TwoLayerNet<B>, ValueObjective> {
        let inputs: InputStream<ValueBatch<B>> = Box::new(|_epoch| {
            Box::new(std::iter::repeat_with(|| {
                let device = Default::default();
                Ok(ValueBatch {
                    observations: Tensor::ones([2, 3, 2], &device),
                    targets: Tensor::zeros([2, 3, 1], &device),
                    mask: Tensor::ones([2, 3, 1], &device),
                })
            }))
        });
        let net = TwoLayerNet::new(2, 4, 1, &Default::default());
        ModuleTrainer::new("value", net, ValueObjective, inputs)
    }

    #[test]
    fn test_copies_adam_moments_between_module_trainers() {
        let mut from = value_trainer();
        let mut to = value_trainer();
        from.train_epoch(3, 1).unwrap();
        to.train_epoch(1, 1).unwrap();
        let to_before = to.optimizer_state().unwrap();

        copy_model_weights(0, 1, &from, &mut to, true).unwrap();

        let source = from.optimizer_state().unwrap();
        let copied = to.optimizer_state().unwrap();
        assert_eq!(
            copied.slot_range(MODEL_SLOT_GROUP, 0..1).unwrap(),
            source.slot_range(MODEL_SLOT_GROUP, 0..1).unwrap()
        );
        assert_eq!(
            copied.slot_range(MODEL_SLOT_GROUP, 1..2).unwrap(),
            to_before.slot_range(MODEL_SLOT_GROUP, 1..2).unwrap()
        );
        assert_ne!(
            source.slot_range(MODEL_SLOT_GROUP, 0..1).unwrap(),
            to_before.slot_range(MODEL_SLOT_GROUP, 0..1).unwrap()
        );
        assert_eq!(copied.step(), 1);
        assert_eq!(
            to.model_weights().unwrap().layer(0),
            from.model_weights().unwrap().layer(0)
        );
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        let from = FakeTrainer::new(&[1.0, 2.0], &[2, 2], 5);
        let mut to = FakeTrainer::new(&[0.0, 0.0], &[2, 2], 9);
        assert!(copy_model_weights(2, 1, &from, &mut to, false).is_err());
    }
}
