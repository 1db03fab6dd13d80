//! Stochastic Gradient Descent (SGD) optimizer implementation
//!
//! This module provides a vanilla SGD optimizer that performs the basic
//! gradient descent update: `parameter = parameter - learning_rate * gradient`

use crate::error::NetResult;
use crate::optimizers::{Optimizer, ParamId};
use crate::tensor::{check_same_shape, Tensor};

/// Stochastic Gradient Descent optimizer.
///
/// Implements the basic gradient descent update rule without momentum or
/// adaptive learning rates:
///
/// `w = w - η * ∇L/∂w`
///
/// SGD keeps no per-parameter state, so the `ParamId` is ignored.
///
/// # Example
///
/// ```
/// use ndarray::arr1;
/// use neural_layers::optimizers::{Optimizer, ParamId, SGD};
///
/// let mut optimizer = SGD::new(0.1);
/// let mut weights = arr1(&[1.0f32, 2.0, 3.0]).into_dyn();
/// let gradients = arr1(&[0.1f32, 0.2, 0.3]).into_dyn();
///
/// optimizer.update_params(ParamId::new(0, 0), &mut weights, &gradients).unwrap();
/// assert!((weights[[0]] - 0.99).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct SGD {
    learning_rate: f32,
}

impl SGD {
    /// Creates a new SGD optimizer with the specified learning rate.
    ///
    /// Common learning rates range from 0.001 to 0.1, depending on the problem.
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }
}

impl Optimizer for SGD {
    fn update_params(&mut self, _id: ParamId, param: &mut Tensor, err_grad: &Tensor) -> NetResult<()> {
        check_same_shape(param, err_grad)?;
        let lr = self.learning_rate;
        param.zip_mut_with(err_grad, |p, &g| *p -= lr * g);
        Ok(())
    }

    fn reset(&mut self) {
        // Vanilla SGD has no state to reset
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, lr: f32) {
        self.learning_rate = lr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetError;
    use ndarray::arr1;

    fn id() -> ParamId {
        ParamId::new(0, 0)
    }

    #[test]
    fn test_sgd_update() {
        let mut optimizer = SGD::new(0.1);
        let mut params = arr1(&[1.0f32, 2.0, 3.0]).into_dyn();
        let grads = arr1(&[0.1f32, 0.2, 0.3]).into_dyn();

        optimizer.update_params(id(), &mut params, &grads).unwrap();

        assert!((params[[0]] - 0.99).abs() < 1e-6);
        assert!((params[[1]] - 1.98).abs() < 1e-6);
        assert!((params[[2]] - 2.97).abs() < 1e-6);
    }

    #[test]
    fn test_sgd_learning_rate_update() {
        let mut optimizer = SGD::new(0.1);
        optimizer.set_learning_rate(0.01);
        assert_eq!(optimizer.learning_rate(), 0.01);

        // Verify the new learning rate is used
        let mut params = arr1(&[1.0f32]).into_dyn();
        let grads = arr1(&[1.0f32]).into_dyn();
        optimizer.update_params(id(), &mut params, &grads).unwrap();
        assert!((params[[0]] - 0.99).abs() < 1e-6);
    }

    #[test]
    fn test_sgd_mismatched_shapes() {
        let mut optimizer = SGD::new(0.01);
        let mut params = arr1(&[1.0f32, 2.0]).into_dyn();
        let grads = arr1(&[0.1f32, 0.2, 0.3]).into_dyn();
        let result = optimizer.update_params(id(), &mut params, &grads);
        assert!(matches!(result, Err(NetError::ShapeMismatch { .. })));
        // Parameter untouched on failure
        assert_eq!(params, arr1(&[1.0f32, 2.0]).into_dyn());
    }

    #[test]
    fn test_sgd_negative_gradients() {
        let mut optimizer = SGD::new(0.1);
        let mut params = arr1(&[1.0f32, 2.0]).into_dyn();
        let grads = arr1(&[-0.5f32, -1.0]).into_dyn();

        optimizer.update_params(id(), &mut params, &grads).unwrap();

        // Negative gradients should increase parameters
        assert!((params[[0]] - 1.05).abs() < 1e-6);
        assert!((params[[1]] - 2.1).abs() < 1e-6);
    }
}
