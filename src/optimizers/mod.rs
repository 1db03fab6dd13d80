//! Optimizer abstractions for neural network parameter updates
//!
//! Optimizers define how to use gradients to update model parameters. The basic
//! gradient descent update is `param = param - learning_rate * gradient`;
//! momentum and Adam additionally keep per-parameter state across steps.
//!
//! # Parameter identity
//!
//! Parameters are owned by their layers, so an optimizer never holds them.
//! Instead every call carries a [`ParamId`] naming the layer position and the
//! parameter slot inside that layer. Stateful optimizers key their moment
//! buffers on it, which keeps the association 1:1 and stable for the whole
//! training run regardless of the order in which parameters are visited.
//!
//! # Available Optimizers
//!
//! - SGD: Vanilla stochastic gradient descent
//! - Momentum: SGD with a velocity term
//! - Adam: Adaptive moment estimation with momentum and adaptive learning rates
//!
//! # Example
//!
//! ```ignore
//! use neural_layers::optimizers::{Adam, Optimizer, ParamId};
//!
//! let mut optimizer = Adam::new(0.001, 0.9, 0.999, 1e-8);
//! optimizer.update_params(ParamId::new(0, 0), &mut weights, &weight_grads)?;
//! optimizer.update_params(ParamId::new(0, 1), &mut bias, &bias_grads)?;
//! ```

pub mod adam;
pub mod momentum;
pub mod sgd;

pub use adam::Adam;
pub use momentum::Momentum;
pub use sgd::SGD;

use crate::error::NetResult;
use crate::tensor::Tensor;

/// Stable key of one owned parameter: layer position and slot within the layer.
///
/// `Sequential` numbers layers by their position, parameter-free layers
/// included, and each trainable layer numbers its parameters in the order of
/// [`TrainableLayer::parameters`](crate::layers::TrainableLayer::parameters)
/// (`0 = weights/kernel`, `1 = bias`).
///
/// # Example
///
/// ```
/// use neural_layers::optimizers::ParamId;
///
/// // Bias of the third layer in the model
/// let id = ParamId::new(2, 1);
/// assert_eq!((id.layer, id.slot), (2, 1));
/// assert!(ParamId::new(0, 1) < id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId {
    /// Position of the owning layer in its model.
    pub layer: usize,
    /// Index of the parameter within that layer.
    pub slot: usize,
}

impl ParamId {
    /// Creates an id from a layer position and a parameter slot.
    ///
    /// # Arguments
    ///
    /// * `layer` - Position of the layer in the model
    /// * `slot` - Parameter index inside the layer
    pub fn new(layer: usize, slot: usize) -> Self {
        Self { layer, slot }
    }
}

/// Core trait for neural network optimizers.
pub trait Optimizer {
    /// Update one parameter in place using its error gradient.
    ///
    /// Fails with `ShapeMismatch` if `param` and `err_grad` differ in shape,
    /// or if state already stored for `id` was built for another shape.
    /// Called once per owned parameter per training step.
    fn update_params(&mut self, id: ParamId, param: &mut Tensor, err_grad: &Tensor) -> NetResult<()>;

    /// Clear any accumulated per-parameter state.
    fn reset(&mut self);

    /// Get the learning rate for this optimizer.
    fn learning_rate(&self) -> f32;

    /// Set the learning rate for this optimizer.
    fn set_learning_rate(&mut self, lr: f32);
}
