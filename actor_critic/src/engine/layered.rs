//! Layer-addressable burn modules.
//!
//! The optimizer and the weight-sharing utility work on [`ModelWeights`]: an
//! ordered list of layers, each a list of flattened parameter blocks. A model
//! opts in by implementing [`LayeredModule::map_layer`], which applies a
//! [`ModuleMapper`] to a single layer; extraction and loading are built on
//! top of it, and the optimizer uses it to address its per-parameter state
//! layer by layer.
//!
//! Parameters are matched by traversal order within a layer, not by
//! `ParamId`, so weights move freely between independently created models
//! with the same layer shapes.

use burn::module::{Module, ModuleMapper, Param};
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};

use crate::core::tensor::to_vec_f32;
use crate::core::{LayerWeights, ModelWeights, ParamBlock};
use crate::error::{Result, TrainerError};

/// A burn module made of an ordered sequence of layers.
///
/// # Example
///
/// ```ignore
/// impl<B: Backend> LayeredModule<B> for Mlp<B> {
///     fn num_layers(&self) -> usize { 2 }
///
///     fn map_layer<M: ModuleMapper<B>>(self, index: usize, mapper: &mut M) -> Self {
///         match index {
///             0 => Self { hidden: self.hidden.map(mapper), ..self },
///             1 => Self { head: self.head.map(mapper), ..self },
///             _ => self,
///         }
///     }
/// }
/// ```
pub trait LayeredModule<B: Backend>: Module<B> {
    fn num_layers(&self) -> usize;

    /// Apply `mapper` to every parameter of layer `index` and to nothing else.
    fn map_layer<M: ModuleMapper<B>>(self, index: usize, mapper: &mut M) -> Self;

    /// Copy out the parameters of layer `index`.
    fn layer_weights(&self, index: usize) -> Result<LayerWeights> {
        check_layer(index, self.num_layers())?;
        let mut collector = ParamCollector::new();
        let _ = self.clone().map_layer(index, &mut collector);
        collector.finish()
    }

    /// Parameter shapes of layer `index`, without copying any values.
    fn layer_shapes(&self, index: usize) -> Result<Vec<Vec<usize>>> {
        check_layer(index, self.num_layers())?;
        let mut collector = ShapeCollector::default();
        let _ = self.clone().map_layer(index, &mut collector);
        Ok(collector.shapes)
    }

    /// Copy out all layers.
    fn weights(&self) -> Result<ModelWeights> {
        (0..self.num_layers())
            .map(|index| self.layer_weights(index))
            .collect::<Result<Vec<_>>>()
            .map(ModelWeights::new)
    }

    /// Return the module with every layer replaced by `weights`.
    ///
    /// Layer count and every parameter shape must match; the gradient
    /// tracking flag of each parameter is kept.
    fn load_weights(self, weights: &ModelWeights) -> Result<Self> {
        if self.num_layers() != weights.len() {
            return Err(TrainerError::ShapeMismatch {
                what: "number of layers".to_string(),
                expected: vec![self.num_layers()],
                actual: vec![weights.len()],
            });
        }
        for (index, want) in weights.layers().iter().enumerate() {
            let have = self.layer_shapes(index)?;
            let same = have.len() == want.params.len()
                && have.iter().zip(&want.params).all(|(h, w)| *h == w.shape);
            if !same {
                return Err(TrainerError::ShapeMismatch {
                    what: format!("layer {index} parameter layout"),
                    expected: have.concat(),
                    actual: want.params.iter().flat_map(|p| p.shape.clone()).collect(),
                });
            }
        }

        let mut module = self;
        for (index, layer) in weights.layers().iter().enumerate() {
            let mut loader = ParamLoader::new(layer);
            module = module.map_layer(index, &mut loader);
        }
        Ok(module)
    }
}

/// A layered model mapping observation sequences `[B, L, obs_dim]` to
/// per-timestep outputs `[B, L, out_dim]`.
pub trait SequenceModel<B: Backend>: LayeredModule<B> {
    fn forward(&self, observations: Tensor<B, 3>) -> Tensor<B, 3>;
}

fn check_layer(index: usize, len: usize) -> Result<()> {
    if index >= len {
        return Err(TrainerError::LayerRange {
            start: index,
            end: index + 1,
            len,
        });
    }
    Ok(())
}

// ============================================================================
// Mappers
// ============================================================================

/// Collects parameter values in traversal order, leaving the module unchanged.
struct ParamCollector {
    params: Vec<ParamBlock>,
    error: Option<TrainerError>,
}

impl ParamCollector {
    fn new() -> Self {
        Self {
            params: Vec::new(),
            error: None,
        }
    }

    fn finish(self) -> Result<LayerWeights> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(LayerWeights::new(self.params)),
        }
    }
}

impl<B: Backend> ModuleMapper<B> for ParamCollector {
    fn map_float<const D: usize>(&mut self, param: Param<Tensor<B, D>>) -> Param<Tensor<B, D>> {
        let value = param.val();
        let shape = value.dims().to_vec();
        match to_vec_f32(value) {
            Ok(values) => self.params.push(ParamBlock { shape, values }),
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        param
    }
}

/// Replaces parameter values in traversal order.
///
/// Layouts are checked by the caller before mapping.
struct ParamLoader<'a> {
    blocks: std::slice::Iter<'a, ParamBlock>,
}

impl<'a> ParamLoader<'a> {
    fn new(layer: &'a LayerWeights) -> Self {
        Self {
            blocks: layer.params.iter(),
        }
    }
}

impl<B: Backend> ModuleMapper<B> for ParamLoader<'_> {
    fn map_float<const D: usize>(&mut self, param: Param<Tensor<B, D>>) -> Param<Tensor<B, D>> {
        let Some(block) = self.blocks.next() else {
            return param;
        };
        let current = param.val();
        let dims = current.dims();
        let data = TensorData::new(block.values.clone(), dims);
        let tensor = Tensor::<B, D>::from_data(data, &current.device())
            .set_require_grad(current.is_require_grad());
        Param::initialized(param.id.clone(), tensor)
    }
}

#[derive(Default)]
struct ShapeCollector {
    shapes: Vec<Vec<usize>>,
}

impl<B: Backend> ModuleMapper<B> for ShapeCollector {
    fn map_float<const D: usize>(&mut self, param: Param<Tensor<B, D>>) -> Param<Tensor<B, D>> {
        self.shapes.push(param.val().dims().to_vec());
        param
    }
}
