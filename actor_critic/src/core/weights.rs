//! Per-layer weight and optimizer-slot value types.
//!
//! Both the model weights and the optimizer state of a subtrainer are ordered
//! sequences of per-layer blocks. A contiguous prefix of layers is the unit of
//! weight sharing between the value and policy models, so both types expose a
//! "read range / replace range" pair. Replacement is a value copy: after it,
//! source and destination are independent.
//!
//! Replacing a range validates every block first and only then writes, so a
//! failed replacement leaves the destination untouched.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainerError};

/// One parameter tensor, flattened row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamBlock {
    pub shape: Vec<usize>,
    pub values: Vec<f32>,
}

impl ParamBlock {
    pub fn new(shape: Vec<usize>, values: Vec<f32>) -> Result<Self> {
        let numel: usize = shape.iter().product();
        if numel != values.len() {
            return Err(TrainerError::ShapeMismatch {
                what: "parameter block".to_string(),
                expected: vec![numel],
                actual: vec![values.len()],
            });
        }
        Ok(Self { shape, values })
    }

    pub fn zeros(shape: Vec<usize>) -> Self {
        let numel = shape.iter().product();
        Self {
            shape,
            values: vec![0.0; numel],
        }
    }
}

/// All parameters of one layer, in the layer's traversal order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayerWeights {
    pub params: Vec<ParamBlock>,
}

impl LayerWeights {
    pub fn new(params: Vec<ParamBlock>) -> Self {
        Self { params }
    }

    /// Whether `other` has the same number of parameters with the same shapes.
    pub fn same_layout(&self, other: &LayerWeights) -> bool {
        self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.shape == b.shape)
    }
}

fn check_range(range: &Range<usize>, len: usize) -> Result<()> {
    if range.start > range.end || range.end > len {
        return Err(TrainerError::LayerRange {
            start: range.start,
            end: range.end,
            len,
        });
    }
    Ok(())
}

/// Overwrite `dst[start..start + src.len()]` with `src` after checking layouts.
fn replace_layers(dst: &mut [LayerWeights], start: usize, src: &[LayerWeights]) -> Result<()> {
    let range = start..start + src.len();
    check_range(&range, dst.len())?;
    for (offset, (old, new)) in dst[range.clone()].iter().zip(src).enumerate() {
        if !old.same_layout(new) {
            let layer = start + offset;
            return Err(TrainerError::ShapeMismatch {
                what: format!("layer {layer} parameter layout"),
                expected: old.params.iter().flat_map(|p| p.shape.clone()).collect(),
                actual: new.params.iter().flat_map(|p| p.shape.clone()).collect(),
            });
        }
    }
    dst[range].clone_from_slice(src);
    Ok(())
}

/// Ordered per-layer weights of a model.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelWeights {
    layers: Vec<LayerWeights>,
}

impl ModelWeights {
    pub fn new(layers: Vec<LayerWeights>) -> Self {
        Self { layers }
    }

    pub fn layers(&self) -> &[LayerWeights] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&LayerWeights> {
        self.layers.get(index)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn into_layers(self) -> Vec<LayerWeights> {
        self.layers
    }

    /// Borrow layers `range`.
    pub fn range(&self, range: Range<usize>) -> Result<&[LayerWeights]> {
        check_range(&range, self.layers.len())?;
        Ok(&self.layers[range])
    }

    /// Replace layers starting at `start` with copies of `blocks`.
    pub fn replace_range(&mut self, start: usize, blocks: &[LayerWeights]) -> Result<()> {
        replace_layers(&mut self.layers, start, blocks)
    }
}

/// Optimizer state blocks for one group of layers, aligned with [`ModelWeights`].
pub type SlotGroup = Vec<LayerWeights>;

/// Internal state of an optimizer.
///
/// Slot group 0 holds the per-layer state of the model's own layers; further
/// groups belong to auxiliary parameters and are never touched by weight
/// sharing. Treated as immutable: updates produce a new value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OptimizerState {
    slots: Vec<SlotGroup>,
    step: usize,
}

impl OptimizerState {
    pub fn new(slots: Vec<SlotGroup>, step: usize) -> Self {
        Self { slots, step }
    }

    pub fn slots(&self) -> &[SlotGroup] {
        &self.slots
    }

    /// Number of optimizer updates applied so far.
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn group(&self, group: usize) -> Result<&SlotGroup> {
        self.slots.get(group).ok_or_else(|| {
            TrainerError::Config(format!(
                "optimizer state has {} slot groups, no group {group}",
                self.slots.len()
            ))
        })
    }

    /// Borrow layers `range` of slot group `group`.
    pub fn slot_range(&self, group: usize, range: Range<usize>) -> Result<&[LayerWeights]> {
        let slots = self.group(group)?;
        check_range(&range, slots.len())?;
        Ok(&slots[range])
    }

    /// Copy of this state with layers `start..` of slot group `group` replaced.
    pub fn with_slot_range(
        mut self,
        group: usize,
        start: usize,
        blocks: &[LayerWeights],
    ) -> Result<Self> {
        self.group(group)?;
        replace_layers(&mut self.slots[group], start, blocks)?;
        Ok(self)
    }

    pub fn with_step(mut self, step: usize) -> Self {
        self.step = step;
        self
    }
}
