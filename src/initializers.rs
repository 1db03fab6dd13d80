//! Parameter initializers
//!
//! An initializer is a pure factory: given a parameter shape it returns a
//! freshly allocated tensor of exactly that shape. Randomized strategies draw
//! from the caller's `SimpleRng`, so repeated calls yield different values
//! while a fixed seed reproduces them.
//!
//! Fan-in and fan-out follow the parameter layout used by the trainable
//! layers: the last axis is the fan-out, the product of all other axes is the
//! fan-in. A dense weight `[n_in, units]` has fan-in `n_in`; a convolution
//! kernel `[kh, kw, c_in, filters]` has fan-in `kh * kw * c_in`.

use ndarray::IxDyn;

use crate::tensor::Tensor;
use crate::utils::SimpleRng;

/// Strategy producing initial parameter values.
pub trait Initializer {
    /// Allocate a tensor of `shape` filled according to this strategy.
    fn initialize(&self, shape: &[usize], rng: &mut SimpleRng) -> Tensor;
}

/// Fan-in and fan-out of a parameter shape.
pub fn fans(shape: &[usize]) -> (usize, usize) {
    match shape.split_last() {
        None => (1, 1),
        Some((&fan_out, [])) => (fan_out, fan_out),
        Some((&fan_out, rest)) => (rest.iter().product(), fan_out),
    }
}

/// All zeros.
#[derive(Debug, Clone, Copy, Default)]
pub struct Zeros;

impl Initializer for Zeros {
    fn initialize(&self, shape: &[usize], _rng: &mut SimpleRng) -> Tensor {
        Tensor::zeros(IxDyn(shape))
    }
}

/// Every element set to the same value.
#[derive(Debug, Clone, Copy)]
pub struct Constant(pub f32);

impl Initializer for Constant {
    fn initialize(&self, shape: &[usize], _rng: &mut SimpleRng) -> Tensor {
        Tensor::from_elem(IxDyn(shape), self.0)
    }
}

/// Uniform samples in `[low, high)`.
#[derive(Debug, Clone, Copy)]
pub struct Uniform {
    pub low: f32,
    pub high: f32,
}

impl Initializer for Uniform {
    fn initialize(&self, shape: &[usize], rng: &mut SimpleRng) -> Tensor {
        Tensor::from_shape_simple_fn(IxDyn(shape), || rng.gen_range_f32(self.low, self.high))
    }
}

/// Gaussian samples with the given mean and standard deviation.
#[derive(Debug, Clone, Copy)]
pub struct Normal {
    pub mean: f32,
    pub std: f32,
}

impl Initializer for Normal {
    fn initialize(&self, shape: &[usize], rng: &mut SimpleRng) -> Tensor {
        Tensor::from_shape_simple_fn(IxDyn(shape), || self.mean + self.std * rng.next_normal())
    }
}

/// Xavier/Glorot uniform: `U(-limit, limit)` with `limit = sqrt(6 / (fan_in + fan_out))`.
#[derive(Debug, Clone, Copy, Default)]
pub struct XavierUniform;

impl Initializer for XavierUniform {
    fn initialize(&self, shape: &[usize], rng: &mut SimpleRng) -> Tensor {
        let (fan_in, fan_out) = fans(shape);
        let limit = (6.0f32 / (fan_in + fan_out).max(1) as f32).sqrt();
        Uniform {
            low: -limit,
            high: limit,
        }
        .initialize(shape, rng)
    }
}

/// He normal: `N(0, sqrt(2 / fan_in))`, suited to ReLU networks.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeNormal;

impl Initializer for HeNormal {
    fn initialize(&self, shape: &[usize], rng: &mut SimpleRng) -> Tensor {
        let (fan_in, _) = fans(shape);
        let std = (2.0f32 / fan_in.max(1) as f32).sqrt();
        Normal { mean: 0.0, std }.initialize(shape, rng)
    }
}
