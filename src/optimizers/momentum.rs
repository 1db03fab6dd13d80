//! SGD with momentum.

use std::collections::HashMap;

use crate::error::NetResult;
use crate::optimizers::{Optimizer, ParamId};
use crate::tensor::{check_same_shape, Tensor};

/// Gradient descent with a velocity term:
///
/// ```text
/// v = μ * v - η * gradient
/// parameter = parameter + v
/// ```
///
/// One velocity buffer is kept per `ParamId`, allocated on first use.
#[derive(Debug, Clone)]
pub struct Momentum {
    learning_rate: f32,
    momentum: f32,
    velocities: HashMap<ParamId, Tensor>,
}

impl Momentum {
    /// Creates a momentum optimizer with no velocity state.
    ///
    /// # Arguments
    ///
    /// * `learning_rate` - Step size η
    /// * `momentum` - Velocity decay μ, usually 0.9; 0 reduces to plain SGD
    ///
    /// # Example
    ///
    /// ```
    /// use ndarray::arr1;
    /// use neural_layers::optimizers::{Momentum, Optimizer, ParamId};
    ///
    /// let mut optimizer = Momentum::new(0.1, 0.9);
    /// let mut w = arr1(&[1.0f32]).into_dyn();
    /// let g = arr1(&[1.0f32]).into_dyn();
    /// let id = ParamId::new(0, 0);
    ///
    /// // v = -0.1, then v = 0.9 * -0.1 - 0.1 = -0.19
    /// optimizer.update_params(id, &mut w, &g).unwrap();
    /// optimizer.update_params(id, &mut w, &g).unwrap();
    /// assert!((w[[0]] - 0.71).abs() < 1e-6);
    /// ```
    pub fn new(learning_rate: f32, momentum: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            velocities: HashMap::new(),
        }
    }

    pub fn momentum(&self) -> f32 {
        self.momentum
    }
}

impl Optimizer for Momentum {
    fn update_params(&mut self, id: ParamId, param: &mut Tensor, err_grad: &Tensor) -> NetResult<()> {
        check_same_shape(param, err_grad)?;
        let velocity = self
            .velocities
            .entry(id)
            .or_insert_with(|| Tensor::zeros(param.raw_dim()));
        check_same_shape(param, velocity)?;

        let (lr, mu) = (self.learning_rate, self.momentum);
        velocity.zip_mut_with(err_grad, |v, &g| *v = mu * *v - lr * g);
        *param += &*velocity;
        Ok(())
    }

    fn reset(&mut self) {
        self.velocities.clear();
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, lr: f32) {
        self.learning_rate = lr;
    }
}
