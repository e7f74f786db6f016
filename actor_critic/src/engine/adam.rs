//! Adam with per-layer state that can be read and replaced.
//!
//! Updates are done by burn's [`Adam`] through its [`OptimizerAdaptor`]. Its
//! records are keyed by [`ParamId`], which ties them to one model instance,
//! while the weight-sharing utility moves the state of a range of layers
//! between independently created models. [`LayerAdam`] therefore projects the
//! records onto an [`OptimizerState`], pairing parameters by traversal order
//! within each layer. For a layer with parameters `p_0..p_k` the block in
//! slot group 0 is
//!
//! ```text
//! [m_0, .., m_k, v_0, .., v_k]
//! ```
//!
//! (first and second moment estimates). A parameter that has no record yet
//! projects to zeros.

use burn::grad_clipping::GradientClippingConfig;
use burn::module::{AutodiffModule, ModuleMapper, Param, ParamId};
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::decay::WeightDecayConfig;
use burn::optim::record::AdaptorRecord;
use burn::optim::{Adam, AdamState, AdaptiveMomentumState, GradientsParams, Optimizer};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{Tensor, TensorData};
use serde::{Deserialize, Serialize};

use super::layered::LayeredModule;
use crate::core::tensor::to_vec_f32;
use crate::core::{LayerWeights, OptimizerState, ParamBlock, SlotGroup};
use crate::error::{Result, TrainerError};

/// Slot group holding the per-layer moments of the model's layers.
pub const MODEL_SLOT_GROUP: usize = 0;

/// Adam hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdamConfig {
    pub beta_1: f32,
    pub beta_2: f32,
    pub epsilon: f32,
    /// L2 penalty added to the gradient; 0 disables it.
    pub weight_decay_rate: f32,
    /// Clip gradients to this global norm before the update.
    pub max_grad_norm: Option<f32>,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            beta_1: 0.9,
            beta_2: 0.999,
            epsilon: 1e-5,
            weight_decay_rate: 1e-5,
            max_grad_norm: None,
        }
    }
}

impl AdamConfig {
    pub fn with_betas(mut self, beta_1: f32, beta_2: f32) -> Self {
        self.beta_1 = beta_1;
        self.beta_2 = beta_2;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_weight_decay_rate(mut self, rate: f32) -> Self {
        self.weight_decay_rate = rate;
        self
    }

    pub fn with_max_grad_norm(mut self, max_norm: f32) -> Self {
        self.max_grad_norm = Some(max_norm);
        self
    }

    /// Create the optimizer for models of type `M`, with empty state.
    pub fn init<B, M>(&self) -> LayerAdam<B, M>
    where
        B: AutodiffBackend,
        M: LayeredModule<B> + AutodiffModule<B>,
    {
        let mut adam_config = burn::optim::AdamConfig::new()
            .with_beta_1(self.beta_1)
            .with_beta_2(self.beta_2)
            .with_epsilon(self.epsilon);

        if self.weight_decay_rate > 0.0 {
            adam_config = adam_config
                .with_weight_decay(Some(WeightDecayConfig::new(self.weight_decay_rate)));
        }
        if let Some(max_norm) = self.max_grad_norm {
            adam_config =
                adam_config.with_grad_clipping(Some(GradientClippingConfig::Norm(max_norm)));
        }

        LayerAdam {
            optimizer: adam_config.init(),
            step: 0,
            extra_groups: Vec::new(),
        }
    }
}

/// burn's Adam for a [`LayeredModule`], with a global step counter and a
/// per-layer view of its moments.
pub struct LayerAdam<B, M>
where
    B: AutodiffBackend,
    M: LayeredModule<B> + AutodiffModule<B>,
{
    optimizer: OptimizerAdaptor<Adam, M, B>,
    step: usize,
    /// Slot groups after the model group, carried through unchanged.
    extra_groups: Vec<SlotGroup>,
}

impl<B, M> LayerAdam<B, M>
where
    B: AutodiffBackend,
    M: LayeredModule<B> + AutodiffModule<B>,
{
    /// Optimizer updates applied so far.
    pub fn step_count(&self) -> usize {
        self.step
    }

    /// Apply one update with learning rate `lr`.
    pub fn step(&mut self, lr: f64, model: M, grads: GradientsParams) -> M {
        self.step += 1;
        self.optimizer.step(lr, model, grads)
    }

    /// Current state, laid out per layer of `model`.
    pub fn state(&self, model: &M) -> Result<OptimizerState> {
        let records = self.optimizer.to_record();
        let mut group = Vec::with_capacity(model.num_layers());
        for index in 0..model.num_layers() {
            let mut reader = MomentReader::new(|id: ParamId| records.get(&id).cloned());
            let _ = model.clone().map_layer(index, &mut reader);
            group.push(reader.finish()?);
        }

        let mut slots = vec![group];
        slots.extend(self.extra_groups.iter().cloned());
        Ok(OptimizerState::new(slots, self.step))
    }

    /// Check that `state` fits the layers of `model`.
    pub fn check_state(&self, model: &M, state: &OptimizerState) -> Result<()> {
        let group = state.group(MODEL_SLOT_GROUP)?;
        if group.len() != model.num_layers() {
            return Err(TrainerError::ShapeMismatch {
                what: "optimizer slot layers".to_string(),
                expected: vec![model.num_layers()],
                actual: vec![group.len()],
            });
        }
        for (index, slots) in group.iter().enumerate() {
            let shapes = model.layer_shapes(index)?;
            let expected: Vec<Vec<usize>> = shapes.iter().chain(&shapes).cloned().collect();
            let actual: Vec<Vec<usize>> = slots.params.iter().map(|p| p.shape.clone()).collect();
            let filled = slots
                .params
                .iter()
                .all(|p| p.values.len() == p.shape.iter().product::<usize>());
            if expected != actual || !filled {
                return Err(TrainerError::ShapeMismatch {
                    what: format!("optimizer slots of layer {index}"),
                    expected: expected.concat(),
                    actual: actual.concat(),
                });
            }
        }
        Ok(())
    }

    /// Replace the state. The moments become the records of `model`'s
    /// parameters, and the step counter becomes `state.step()`.
    pub fn set_state(&mut self, model: &M, state: OptimizerState) -> Result<()> {
        self.check_state(model, &state)?;

        let mut records = self.optimizer.to_record();
        for (index, slots) in state.group(MODEL_SLOT_GROUP)?.iter().enumerate() {
            let mut writer = MomentWriter::new(slots, state.step());
            let _ = model.clone().map_layer(index, &mut writer);
            for (id, record) in writer.records {
                records.insert(id, record);
            }
        }

        self.optimizer = self.optimizer.clone().load_record(records);
        self.step = state.step();
        self.extra_groups = state.slots()[MODEL_SLOT_GROUP + 1..].to_vec();
        Ok(())
    }
}

// ============================================================================
// Mappers
// ============================================================================

/// Reads the moments of each visited parameter through `lookup`.
struct MomentReader<F> {
    lookup: F,
    first: Vec<ParamBlock>,
    second: Vec<ParamBlock>,
    error: Option<TrainerError>,
}

impl<F> MomentReader<F> {
    fn new(lookup: F) -> Self {
        Self {
            lookup,
            first: Vec::new(),
            second: Vec::new(),
            error: None,
        }
    }

    fn finish(self) -> Result<LayerWeights> {
        if let Some(e) = self.error {
            return Err(e);
        }
        let mut params = self.first;
        params.extend(self.second);
        Ok(LayerWeights::new(params))
    }
}

impl<B, F> ModuleMapper<B> for MomentReader<F>
where
    B: AutodiffBackend,
    F: Fn(ParamId) -> Option<AdaptorRecord<Adam, B>>,
{
    fn map_float<const D: usize>(&mut self, param: Param<Tensor<B, D>>) -> Param<Tensor<B, D>> {
        let shape = param.val().dims().to_vec();
        let Some(record) = (self.lookup)(param.id) else {
            self.first.push(ParamBlock::zeros(shape.clone()));
            self.second.push(ParamBlock::zeros(shape));
            return param;
        };

        let momentum = record.into_state::<D>().momentum;
        match (to_vec_f32(momentum.moment_1), to_vec_f32(momentum.moment_2)) {
            (Ok(m), Ok(v)) => {
                self.first.push(ParamBlock {
                    shape: shape.clone(),
                    values: m,
                });
                self.second.push(ParamBlock { shape, values: v });
            }
            (Err(e), _) | (_, Err(e)) => {
                self.error.get_or_insert(e);
            }
        }
        param
    }
}

/// Turns one layer's slot block into Adam records, in traversal order.
///
/// Layouts are checked by the caller before mapping.
struct MomentWriter<'a, B: AutodiffBackend> {
    first: std::slice::Iter<'a, ParamBlock>,
    second: std::slice::Iter<'a, ParamBlock>,
    time: usize,
    records: Vec<(ParamId, AdaptorRecord<Adam, B>)>,
}

impl<'a, B: AutodiffBackend> MomentWriter<'a, B> {
    fn new(slots: &'a LayerWeights, time: usize) -> Self {
        let (first, second) = slots.params.split_at(slots.params.len() / 2);
        Self {
            first: first.iter(),
            second: second.iter(),
            time,
            records: Vec::new(),
        }
    }
}

impl<B: AutodiffBackend> ModuleMapper<B> for MomentWriter<'_, B> {
    fn map_float<const D: usize>(&mut self, param: Param<Tensor<B, D>>) -> Param<Tensor<B, D>> {
        let (Some(m), Some(v)) = (self.first.next(), self.second.next()) else {
            return param;
        };
        let device = param.val().inner().device();
        let moment_1 = Tensor::<B::InnerBackend, D>::from_data(
            TensorData::new(m.values.clone(), m.shape.clone()),
            &device,
        );
        let moment_2 = Tensor::<B::InnerBackend, D>::from_data(
            TensorData::new(v.values.clone(), v.shape.clone()),
            &device,
        );

        let state = AdamState::new(AdaptiveMomentumState::new(self.time, moment_1, moment_2));
        self.records.push((param.id, AdaptorRecord::from_state(state)));
        param
    }
}
