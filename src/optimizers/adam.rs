//! Adam (Adaptive Moment Estimation) optimizer implementation
//!
//! This module provides the Adam optimizer, which combines momentum and
//! adaptive learning rates with bias correction for improved convergence.

use std::collections::HashMap;

use crate::error::NetResult;
use crate::optimizers::{Optimizer, ParamId};
use crate::tensor::{check_same_shape, Tensor};

/// Moment estimates and step counter for one parameter.
#[derive(Debug, Clone)]
struct AdamState {
    m: Tensor,
    v: Tensor,
    t: i32,
}

/// Adam (Adaptive Moment Estimation) optimizer.
///
/// The update rule is:
///
/// ```text
/// m_t = β1 * m_{t-1} + (1 - β1) * gradient
/// v_t = β2 * v_{t-1} + (1 - β2) * gradient²
/// m_hat = m_t / (1 - β1^t)
/// v_hat = v_t / (1 - β2^t)
/// parameter = parameter - α * m_hat / (√v_hat + ε)
/// ```
///
/// Each `ParamId` owns its own moments and its own time step, so visiting
/// the parameters of a model in a different order only changes rounding.
///
/// # Example
///
/// ```
/// use ndarray::arr1;
/// use neural_layers::optimizers::{Adam, Optimizer, ParamId};
///
/// let mut optimizer = Adam::new(0.001, 0.9, 0.999, 1e-8);
/// let mut weights = arr1(&[1.0f32, 2.0, 3.0]).into_dyn();
/// let gradients = arr1(&[0.1f32, 0.2, 0.3]).into_dyn();
///
/// optimizer.update_params(ParamId::new(0, 0), &mut weights, &gradients).unwrap();
/// assert!(weights[[0]] < 1.0);
/// ```
///
/// # Reference
///
/// Kingma, D. P., & Ba, J. (2014). Adam: A method for stochastic optimization.
/// arXiv preprint arXiv:1412.6980.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    state: HashMap<ParamId, AdamState>,
}

impl Adam {
    /// Creates a new Adam optimizer with the specified hyperparameters.
    ///
    /// The original Adam paper recommends `learning_rate = 0.001`,
    /// `beta1 = 0.9`, `beta2 = 0.999`, `epsilon = 1e-8`.
    pub fn new(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            state: HashMap::new(),
        }
    }

    /// Number of updates applied to the given parameter so far.
    pub fn steps(&self, id: ParamId) -> usize {
        self.state.get(&id).map_or(0, |s| s.t as usize)
    }
}

impl Default for Adam {
    fn default() -> Self {
        Self::new(0.001, 0.9, 0.999, 1e-8)
    }
}

impl Optimizer for Adam {
    fn update_params(&mut self, id: ParamId, param: &mut Tensor, err_grad: &Tensor) -> NetResult<()> {
        check_same_shape(param, err_grad)?;
        let state = self.state.entry(id).or_insert_with(|| AdamState {
            m: Tensor::zeros(param.raw_dim()),
            v: Tensor::zeros(param.raw_dim()),
            t: 0,
        });
        check_same_shape(param, &state.m)?;

        state.t += 1;
        let (beta1, beta2) = (self.beta1, self.beta2);
        let bias_correction1 = 1.0 - beta1.powi(state.t);
        let bias_correction2 = 1.0 - beta2.powi(state.t);

        state.m.zip_mut_with(err_grad, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        state.v.zip_mut_with(err_grad, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

        let (lr, eps) = (self.learning_rate, self.epsilon);
        ndarray::Zip::from(param)
            .and(&state.m)
            .and(&state.v)
            .for_each(|p, &m, &v| {
                let m_hat = m / bias_correction1;
                let v_hat = v / bias_correction2;
                *p -= lr * m_hat / (v_hat.sqrt() + eps);
            });
        Ok(())
    }

    fn reset(&mut self) {
        self.state.clear();
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, lr: f32) {
        self.learning_rate = lr;
    }
}
