//! Conversions between burn tensors and flat `f32` buffers.
//!
//! Advantage estimation and the per-layer weight and optimizer snapshots work
//! on row-major `Vec<f32>`; these helpers move data across that boundary.

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};

use crate::error::{Result, TrainerError};

/// Copy a float tensor into a row-major `Vec<f32>`.
pub fn to_vec_f32<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| TrainerError::Tensor(format!("{e:?}")))
}

/// Build a float tensor of shape `dims` from row-major values.
pub fn from_vec_f32<B: Backend, const D: usize>(
    values: Vec<f32>,
    dims: [usize; D],
    device: &B::Device,
) -> Result<Tensor<B, D>> {
    let expected: usize = dims.iter().product();
    if values.len() != expected {
        return Err(TrainerError::ShapeMismatch {
            what: "tensor buffer".to_string(),
            expected: vec![expected],
            actual: vec![values.len()],
        });
    }
    Ok(Tensor::from_data(TensorData::new(values, dims), device))
}
