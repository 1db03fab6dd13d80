//! Tensor substrate shared by every layer.
//!
//! Tensors are dynamic-rank `f32` arrays whose first axis is the batch. A
//! `Shape` describes one sample, so a tensor conforms to shape `s` when its
//! shape with the batch axis removed equals `s`.

use ndarray::{ArrayD, Ix2, Ix4, IxDyn};

use crate::error::{NetError, NetResult};

/// Dynamic-rank `f32` array with a leading batch axis.
pub type Tensor = ArrayD<f32>;

/// Per-sample dimension sizes (batch axis excluded).
pub type Shape = Vec<usize>;

/// Execution mode supplied by the caller on every forward pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Training,
    Inference,
}

/// Total number of scalars described by a shape.
pub fn element_count(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Fail with `ShapeMismatch` unless `tensor` is a batch of `shape` samples.
pub fn check_conforms(tensor: &Tensor, shape: &[usize]) -> NetResult<()> {
    let actual = tensor.shape();
    if actual.len() != shape.len() + 1 || &actual[1..] != shape {
        let mut expected = Vec::with_capacity(shape.len() + 1);
        expected.push(actual.first().copied().unwrap_or(0));
        expected.extend_from_slice(shape);
        return Err(NetError::shape(&expected, actual));
    }
    Ok(())
}

/// Fail with `ShapeMismatch` unless both tensors have identical shapes.
pub fn check_same_shape(expected: &Tensor, actual: &Tensor) -> NetResult<()> {
    if expected.shape() != actual.shape() {
        return Err(NetError::shape(expected.shape(), actual.shape()));
    }
    Ok(())
}

/// Build a tensor from a shape and row-major data.
pub fn from_vec(shape: &[usize], data: Vec<f32>) -> NetResult<Tensor> {
    let len = data.len();
    ArrayD::from_shape_vec(IxDyn(shape), data).map_err(|_| NetError::shape(shape, &[len]))
}

/// View a batch tensor as a `(batch, features)` matrix.
pub(crate) fn to_matrix(tensor: &Tensor) -> NetResult<ndarray::Array2<f32>> {
    tensor
        .clone()
        .into_dimensionality::<Ix2>()
        .map_err(|_| NetError::shape(&[tensor.len_of(ndarray::Axis(0)), 0], tensor.shape()))
}

/// View a batch tensor as a `(batch, height, width, channels)` array.
pub(crate) fn to_nhwc(tensor: &Tensor) -> NetResult<ndarray::Array4<f32>> {
    tensor
        .clone()
        .into_dimensionality::<Ix4>()
        .map_err(|_| NetError::shape(&[0, 0, 0, 0], tensor.shape()))
}
