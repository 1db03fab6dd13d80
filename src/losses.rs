//! Loss functions
//!
//! A loss is stateless: `func` maps `(y_true, y_pred)` to an elementwise loss
//! and `func_prime` to the elementwise gradient with respect to `y_pred`. Both
//! outputs have the shape of the inputs; reducing to a scalar is left to
//! `mean_loss` so that the gradient handed to `backward` stays elementwise.

use crate::error::NetResult;
use crate::tensor::{check_same_shape, Tensor};

/// Probabilities are clipped to `[EPS, 1 - EPS]` before taking logarithms.
const EPS: f32 = 1e-7;

/// Objective function and its derivative with respect to predictions.
pub trait Loss {
    /// Elementwise loss values.
    fn func(&self, y_true: &Tensor, y_pred: &Tensor) -> NetResult<Tensor>;

    /// Elementwise gradient of `func` with respect to `y_pred`, `y_true` held fixed.
    fn func_prime(&self, y_true: &Tensor, y_pred: &Tensor) -> NetResult<Tensor>;

    fn name(&self) -> &'static str;
}

/// Mean of the elementwise loss over every element of the batch.
pub fn mean_loss(loss: &dyn Loss, y_true: &Tensor, y_pred: &Tensor) -> NetResult<f32> {
    let values = loss.func(y_true, y_pred)?;
    Ok(values.mean().unwrap_or(0.0))
}

fn zip_map<F>(y_true: &Tensor, y_pred: &Tensor, f: F) -> NetResult<Tensor>
where
    F: Fn(f32, f32) -> f32,
{
    check_same_shape(y_true, y_pred)?;
    let mut out = y_pred.clone();
    out.zip_mut_with(y_true, |p, &t| *p = f(t, *p));
    Ok(out)
}

fn clip(p: f32) -> f32 {
    p.clamp(EPS, 1.0 - EPS)
}

/// Squared error: `(p - t)^2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanSquaredError;

impl Loss for MeanSquaredError {
    fn func(&self, y_true: &Tensor, y_pred: &Tensor) -> NetResult<Tensor> {
        zip_map(y_true, y_pred, |t, p| (p - t) * (p - t))
    }

    fn func_prime(&self, y_true: &Tensor, y_pred: &Tensor) -> NetResult<Tensor> {
        zip_map(y_true, y_pred, |t, p| 2.0 * (p - t))
    }

    fn name(&self) -> &'static str {
        "MeanSquaredError"
    }
}

/// Binary cross-entropy on probabilities (e.g. a sigmoid output).
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCrossEntropy;

impl Loss for BinaryCrossEntropy {
    fn func(&self, y_true: &Tensor, y_pred: &Tensor) -> NetResult<Tensor> {
        zip_map(y_true, y_pred, |t, p| {
            let p = clip(p);
            -(t * p.ln() + (1.0 - t) * (1.0 - p).ln())
        })
    }

    fn func_prime(&self, y_true: &Tensor, y_pred: &Tensor) -> NetResult<Tensor> {
        zip_map(y_true, y_pred, |t, p| {
            let p = clip(p);
            (p - t) / (p * (1.0 - p))
        })
    }

    fn name(&self) -> &'static str {
        "BinaryCrossEntropy"
    }
}

/// Categorical cross-entropy on one-hot targets and probability predictions.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoricalCrossEntropy;

impl Loss for CategoricalCrossEntropy {
    fn func(&self, y_true: &Tensor, y_pred: &Tensor) -> NetResult<Tensor> {
        zip_map(y_true, y_pred, |t, p| -t * clip(p).ln())
    }

    fn func_prime(&self, y_true: &Tensor, y_pred: &Tensor) -> NetResult<Tensor> {
        zip_map(y_true, y_pred, |t, p| -t / clip(p))
    }

    fn name(&self) -> &'static str {
        "CategoricalCrossEntropy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetError;
    use ndarray::{arr1, arr2};

    #[test]
    fn test_mse_values_and_gradient() {
        let y_true = arr1(&[1.0f32, 0.0]).into_dyn();
        let y_pred = arr1(&[1.0f32, 1.0]).into_dyn();

        let loss = MeanSquaredError.func(&y_true, &y_pred).unwrap();
        let grad = MeanSquaredError.func_prime(&y_true, &y_pred).unwrap();

        assert_eq!(loss.as_slice().unwrap(), &[0.0, 1.0]);
        assert_eq!(grad.as_slice().unwrap(), &[0.0, 2.0]);
    }

    #[test]
    fn test_mean_loss() {
        let y_true = arr2(&[[1.0f32, 0.0], [0.0, 0.0]]).into_dyn();
        let y_pred = arr2(&[[1.0f32, 1.0], [1.0, 1.0]]).into_dyn();
        let value = mean_loss(&MeanSquaredError, &y_true, &y_pred).unwrap();
        assert!((value - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_shape_mismatch_is_reported() {
        let y_true = arr1(&[1.0f32, 0.0, 1.0]).into_dyn();
        let y_pred = arr1(&[1.0f32, 1.0]).into_dyn();
        assert!(matches!(
            MeanSquaredError.func(&y_true, &y_pred),
            Err(NetError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            BinaryCrossEntropy.func_prime(&y_true, &y_pred),
            Err(NetError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_bce_is_finite_at_saturation() {
        let y_true = arr1(&[1.0f32, 0.0]).into_dyn();
        let y_pred = arr1(&[0.0f32, 1.0]).into_dyn();
        let loss = BinaryCrossEntropy.func(&y_true, &y_pred).unwrap();
        let grad = BinaryCrossEntropy.func_prime(&y_true, &y_pred).unwrap();
        assert!(loss.iter().all(|v| v.is_finite() && *v > 0.0));
        assert!(grad.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_cce_ignores_zero_targets() {
        let y_true = arr1(&[0.0f32, 1.0, 0.0]).into_dyn();
        let y_pred = arr1(&[0.2f32, 0.5, 0.3]).into_dyn();
        let loss = CategoricalCrossEntropy.func(&y_true, &y_pred).unwrap();
        assert_eq!(loss[[0]], 0.0);
        assert!((loss[[1]] - 0.5f32.ln().abs()).abs() < 1e-6);
        assert_eq!(loss[[2]], 0.0);
    }
}
