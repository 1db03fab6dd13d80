//! Dense (fully connected) layer implementation
//!
//! This module provides a DenseLayer (also known as Linear or Fully Connected layer)
//! that performs the transformation: output = input × weights + biases

use ndarray::Axis;

use crate::error::{NetError, NetResult};
use crate::initializers::{Initializer, XavierUniform, Zeros};
use crate::layers::{parameter_count, Layer, LayerShapes, TrainableLayer};
use crate::tensor::{check_conforms, to_matrix, Mode, Tensor};
use crate::utils::SimpleRng;

/// Parameters and their gradients, allocated by `init()`.
#[derive(Debug, Clone)]
struct DenseParams {
    weights: Tensor,
    biases: Tensor,
    grad_weights: Tensor,
    grad_biases: Tensor,
}

/// Dense (fully connected) layer with weights and biases.
///
/// Performs the linear transformation: y = xW + b
/// where x is the input (batch_size × input_size),
/// W is the weight matrix (input_size × units),
/// and b is the bias vector (units).
///
/// The input shape must be one-dimensional; flatten convolutional features
/// first. Parameter slots: `0 = weights`, `1 = biases`.
///
/// # Example
///
/// ```
/// use neural_layers::layers::{DenseLayer, Layer};
/// use neural_layers::utils::SimpleRng;
///
/// let mut rng = SimpleRng::new(42);
/// let mut layer = DenseLayer::new(512);
/// layer.set_input_shape(&[784]);
/// layer.init(&mut rng).unwrap();
/// assert_eq!(layer.output_shape(), Some(&[512][..]));
/// assert_eq!(layer.params(), 784 * 512 + 512);
/// ```
pub struct DenseLayer {
    units: usize,
    display: String,
    shapes: LayerShapes,
    weight_init: Box<dyn Initializer>,
    bias_init: Box<dyn Initializer>,
    params: Option<DenseParams>,
    cached_input: Option<Tensor>,
}

impl DenseLayer {
    /// Create a dense layer with `units` outputs.
    ///
    /// Weights use Xavier/Glorot uniform initialization, biases start at zero.
    pub fn new(units: usize) -> Self {
        Self {
            units,
            display: "Dense".to_string(),
            shapes: LayerShapes::new(),
            weight_init: Box::new(XavierUniform),
            bias_init: Box::new(Zeros),
            params: None,
            cached_input: None,
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = display.into();
        self
    }

    /// Replace the weight initializer.
    ///
    /// # Arguments
    ///
    /// * `init` - Initializer for the `[input_size, units]` weight matrix
    ///
    /// # Example
    ///
    /// ```
    /// use ndarray::arr2;
    /// use neural_layers::initializers::Constant;
    /// use neural_layers::layers::{DenseLayer, Layer};
    /// use neural_layers::tensor::Mode;
    /// use neural_layers::utils::SimpleRng;
    ///
    /// let mut layer = DenseLayer::new(1).with_weight_init(Constant(0.5));
    /// layer.set_input_shape(&[2]);
    /// layer.init(&mut SimpleRng::new(1)).unwrap();
    ///
    /// // 0.5 * 1 + 0.5 * 3, zero bias
    /// let y = layer.forward(&arr2(&[[1.0f32, 3.0]]).into_dyn(), Mode::Inference).unwrap();
    /// assert_eq!(y[[0, 0]], 2.0);
    /// ```
    pub fn with_weight_init(mut self, init: impl Initializer + 'static) -> Self {
        self.weight_init = Box::new(init);
        self
    }

    /// Replace the bias initializer (zeros by default).
    pub fn with_bias_init(mut self, init: impl Initializer + 'static) -> Self {
        self.bias_init = Box::new(init);
        self
    }

    pub fn units(&self) -> usize {
        self.units
    }

    pub fn weights(&self) -> Option<&Tensor> {
        self.params.as_ref().map(|p| &p.weights)
    }

    pub fn biases(&self) -> Option<&Tensor> {
        self.params.as_ref().map(|p| &p.biases)
    }

    fn ready_params(&self, operation: &'static str) -> NetResult<&DenseParams> {
        self.params
            .as_ref()
            .ok_or_else(|| NetError::uninitialized(&self.display, operation))
    }
}

impl Layer for DenseLayer {
    fn display(&self) -> &str {
        &self.display
    }

    fn shapes(&self) -> &LayerShapes {
        &self.shapes
    }

    fn shapes_mut(&mut self) -> &mut LayerShapes {
        &mut self.shapes
    }

    fn params(&self) -> usize {
        parameter_count(self)
    }

    fn init(&mut self, rng: &mut SimpleRng) -> NetResult<()> {
        let input = self.shapes.require_input(&self.display)?;
        let input_size = match input {
            [n] => *n,
            _ => {
                return Err(NetError::InvalidConfig(format!(
                    "{} expects a 1-D input shape, got {:?}",
                    self.display, input
                )))
            }
        };

        let weight_shape = [input_size, self.units];
        let bias_shape = [self.units];
        self.params = Some(DenseParams {
            weights: self.weight_init.initialize(&weight_shape, rng),
            biases: self.bias_init.initialize(&bias_shape, rng),
            grad_weights: Tensor::zeros(ndarray::IxDyn(&weight_shape)),
            grad_biases: Tensor::zeros(ndarray::IxDyn(&bias_shape)),
        });
        self.cached_input = None;
        self.shapes.set_output(vec![self.units]);
        Ok(())
    }

    fn forward(&mut self, x: &Tensor, _mode: Mode) -> NetResult<Tensor> {
        let (input, _) = self.shapes.require_ready(&self.display, "forward")?;
        check_conforms(x, input)?;
        let params = self.ready_params("forward")?;

        let w = params.weights.view().into_dimensionality::<ndarray::Ix2>().map_err(|_| {
            NetError::shape(&[input[0], self.units], params.weights.shape())
        })?;
        let x2 = to_matrix(x)?;
        let y = x2.dot(&w) + &params.biases;

        self.cached_input = Some(x.clone());
        Ok(y.into_dyn())
    }

    fn backward(&mut self, dy: &Tensor) -> NetResult<Tensor> {
        // The cache survives a rejected gradient
        let cached = self
            .cached_input
            .as_ref()
            .ok_or_else(|| NetError::uninitialized(&self.display, "backward"))?;
        let params = self
            .params
            .as_mut()
            .ok_or_else(|| NetError::uninitialized(&self.display, "backward"))?;

        let batch = cached.len_of(Axis(0));
        if dy.shape() != [batch, self.units] {
            return Err(NetError::shape(&[batch, self.units], dy.shape()));
        }

        let x2 = to_matrix(cached)?;
        let dy2 = to_matrix(dy)?;
        let w = params
            .weights
            .view()
            .into_dimensionality::<ndarray::Ix2>()
            .map_err(|_| NetError::shape(&[0, 0], params.weights.shape()))?;

        // dW = Xᵀ·dY, db = Σ_batch dY, dX = dY·Wᵀ
        let dx = dy2.dot(&w.t());
        params.grad_weights = x2.t().dot(&dy2).into_dyn();
        params.grad_biases = dy2.sum_axis(Axis(0)).into_dyn();
        self.cached_input = None;
        Ok(dx.into_dyn())
    }

    fn as_trainable(&self) -> Option<&dyn TrainableLayer> {
        Some(self)
    }

    fn as_trainable_mut(&mut self) -> Option<&mut dyn TrainableLayer> {
        Some(self)
    }
}

impl TrainableLayer for DenseLayer {
    fn parameters(&self) -> Vec<&Tensor> {
        match &self.params {
            Some(p) => vec![&p.weights, &p.biases],
            None => Vec::new(),
        }
    }

    fn gradients(&self) -> Vec<&Tensor> {
        match &self.params {
            Some(p) => vec![&p.grad_weights, &p.grad_biases],
            None => Vec::new(),
        }
    }

    fn parameters_and_gradients(&mut self) -> Vec<(&mut Tensor, &Tensor)> {
        match &mut self.params {
            Some(p) => vec![
                (&mut p.weights, &p.grad_weights),
                (&mut p.biases, &p.grad_biases),
            ],
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::initializers::Constant;
    use ndarray::arr2;

    fn built(input: usize, units: usize, seed: u64) -> DenseLayer {
        let mut layer = DenseLayer::new(units);
        layer.set_input_shape(&[input]);
        layer.init(&mut SimpleRng::new(seed)).unwrap();
        layer
    }

    #[test]
    fn test_dense_layer_parameter_count() {
        let layer = built(784, 512, 42);
        // 784 × 512 weights + 512 biases = 401,408 + 512 = 401,920
        assert_eq!(layer.params(), 784 * 512 + 512);
        assert_eq!(layer.output_shape(), Some(&[512][..]));
    }

    #[test]
    fn test_params_zero_before_init() {
        let layer = DenseLayer::new(8);
        assert_eq!(layer.params(), 0);
        assert!(layer.parameters().is_empty());
    }

    #[test]
    fn test_xavier_initialization() {
        let layer = built(100, 50, 42);
        let limit = (6.0f32 / 150.0).sqrt();

        for &weight in layer.weights().unwrap().iter() {
            assert!(weight >= -limit && weight <= limit);
        }
        assert!(layer.biases().unwrap().iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_deterministic_initialization() {
        let layer1 = built(10, 5, 42);
        let layer2 = built(10, 5, 42);
        assert_eq!(layer1.weights(), layer2.weights());
    }

    #[test]
    fn test_reinit_keeps_shapes() {
        let mut layer = built(6, 3, 1);
        let before: Vec<Vec<usize>> = layer.parameters().iter().map(|p| p.shape().to_vec()).collect();
        layer.init(&mut SimpleRng::new(2)).unwrap();
        let after: Vec<Vec<usize>> = layer.parameters().iter().map(|p| p.shape().to_vec()).collect();
        assert_eq!(before, after);
        assert_eq!(layer.output_shape(), Some(&[3][..]));
    }

    #[test]
    fn test_forward_known_values() {
        let mut layer = DenseLayer::new(2)
            .with_weight_init(Constant(1.0))
            .with_bias_init(Constant(0.5));
        layer.set_input_shape(&[3]);
        layer.init(&mut SimpleRng::new(1)).unwrap();

        let x = arr2(&[[1.0f32, 2.0, 3.0], [0.0, 0.0, 1.0]]).into_dyn();
        let y = layer.forward(&x, Mode::Training).unwrap();
        assert_eq!(y, arr2(&[[6.5f32, 6.5], [1.5, 1.5]]).into_dyn());
    }

    #[test]
    fn test_backward_gradients() {
        let mut layer = DenseLayer::new(2)
            .with_weight_init(Constant(1.0))
            .with_bias_init(Constant(0.0));
        layer.set_input_shape(&[3]);
        layer.init(&mut SimpleRng::new(1)).unwrap();

        let x = arr2(&[[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]]).into_dyn();
        layer.forward(&x, Mode::Training).unwrap();
        let dy = arr2(&[[1.0f32, 0.0], [0.0, 1.0]]).into_dyn();
        let dx = layer.backward(&dy).unwrap();

        assert_eq!(dx, arr2(&[[1.0f32, 1.0, 1.0], [1.0, 1.0, 1.0]]).into_dyn());
        let grads = layer.gradients();
        assert_eq!(
            *grads[0],
            arr2(&[[1.0f32, 4.0], [2.0, 5.0], [3.0, 6.0]]).into_dyn()
        );
        assert_eq!(grads[1].as_slice().unwrap(), &[1.0, 1.0]);
    }

    #[test]
    fn test_wrong_input_width() {
        let mut layer = built(3, 2, 1);
        let x = arr2(&[[1.0f32, 2.0]]).into_dyn();
        assert!(matches!(
            layer.forward(&x, Mode::Training),
            Err(NetError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_rejected_gradient_keeps_cache() {
        let mut layer = built(3, 2, 1);
        let x = arr2(&[[1.0f32, 2.0, 3.0]]).into_dyn();
        layer.forward(&x, Mode::Training).unwrap();

        let wrong = Tensor::ones(ndarray::IxDyn(&[1, 5]));
        assert!(matches!(layer.backward(&wrong), Err(NetError::ShapeMismatch { .. })));

        let dx = layer.backward(&Tensor::ones(ndarray::IxDyn(&[1, 2]))).unwrap();
        assert_eq!(dx.shape(), &[1, 3]);
        assert!(matches!(
            layer.backward(&Tensor::ones(ndarray::IxDyn(&[1, 2]))),
            Err(NetError::UninitializedAccess { .. })
        ));
    }

    #[test]
    fn test_new_input_shape_needs_init() {
        let mut layer = built(3, 2, 1);
        layer.set_input_shape(&[4]);
        let x = Tensor::ones(ndarray::IxDyn(&[1, 4]));
        assert!(matches!(
            layer.forward(&x, Mode::Training),
            Err(NetError::UninitializedAccess { .. })
        ));

        layer.init(&mut SimpleRng::new(1)).unwrap();
        assert_eq!(layer.params(), 4 * 2 + 2);
        assert_eq!(layer.forward(&x, Mode::Training).unwrap().shape(), &[1, 2]);
    }

    #[test]
    fn test_multi_dimensional_input_rejected() {
        let mut layer = DenseLayer::new(4);
        layer.set_input_shape(&[2, 2]);
        assert!(matches!(
            layer.init(&mut SimpleRng::new(1)),
            Err(NetError::InvalidConfig(_))
        ));
    }
}
