//! 2D Convolutional layer implementation
//!
//! This module provides a Conv2DLayer that performs 2D convolution operations,
//! commonly used in computer vision tasks like image classification. Inputs
//! are channels-last: one sample has shape `[height, width, channels]`.

use ndarray::{Ix1, Ix4};

use crate::error::{NetError, NetResult};
use crate::initializers::{Initializer, XavierUniform, Zeros};
use crate::kernels::{conv2d_backward, conv2d_forward, conv2d_output_size, Padding};
use crate::layers::{parameter_count, Layer, LayerShapes, TrainableLayer};
use crate::tensor::{check_conforms, to_nhwc, Mode, Tensor};
use crate::utils::SimpleRng;

#[derive(Debug, Clone)]
struct ConvParams {
    kernel: Tensor,
    bias: Tensor,
    grad_kernel: Tensor,
    grad_bias: Tensor,
}

/// 2D Convolutional layer with learnable filters.
///
/// Slides `filters` kernels of size `kernel_h × kernel_w` over the input with
/// stride 1. The kernel tensor has shape `[kernel_h, kernel_w, in_channels,
/// filters]` and the bias `[filters]`; `in_channels` is taken from the input
/// shape at `init()`.
///
/// Parameter slots: `0 = kernel`, `1 = bias`.
///
/// # Example
///
/// ```
/// use neural_layers::kernels::Padding;
/// use neural_layers::layers::{Conv2DLayer, Layer};
/// use neural_layers::utils::SimpleRng;
///
/// let mut rng = SimpleRng::new(42);
/// // 8 filters, 3x3 kernel, output keeps the 28x28 extent
/// let mut layer = Conv2DLayer::new(8, (3, 3), Padding::Same);
/// layer.set_input_shape(&[28, 28, 1]);
/// layer.init(&mut rng).unwrap();
/// assert_eq!(layer.output_shape(), Some(&[28, 28, 8][..]));
/// assert_eq!(layer.params(), 3 * 3 * 1 * 8 + 8);
/// ```
pub struct Conv2DLayer {
    filters: usize,
    kernel_size: (usize, usize),
    padding: Padding,
    display: String,
    shapes: LayerShapes,
    kernel_init: Box<dyn Initializer>,
    bias_init: Box<dyn Initializer>,
    params: Option<ConvParams>,
    cached_input: Option<Tensor>,
}

impl Conv2DLayer {
    /// Create a convolution with Xavier uniform kernels and zero biases.
    pub fn new(filters: usize, kernel_size: (usize, usize), padding: Padding) -> Self {
        Self {
            filters,
            kernel_size,
            padding,
            display: "Conv2D".to_string(),
            shapes: LayerShapes::new(),
            kernel_init: Box::new(XavierUniform),
            bias_init: Box::new(Zeros),
            params: None,
            cached_input: None,
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = display.into();
        self
    }

    /// Replace the kernel initializer.
    ///
    /// The initializer is applied at every `init()`, so a rebuilt layer draws
    /// fresh kernels from it.
    ///
    /// # Arguments
    ///
    /// * `init` - Initializer for the `[kernel_h, kernel_w, in_channels, filters]` kernel
    ///
    /// # Returns
    ///
    /// The layer, for chaining with the other builder methods.
    ///
    /// # Example
    ///
    /// ```
    /// use neural_layers::initializers::Constant;
    /// use neural_layers::kernels::Padding;
    /// use neural_layers::layers::{Conv2DLayer, Layer};
    /// use neural_layers::utils::SimpleRng;
    ///
    /// let mut layer = Conv2DLayer::new(2, (3, 3), Padding::Valid).with_kernel_init(Constant(0.25));
    /// layer.set_input_shape(&[5, 5, 1]);
    /// layer.init(&mut SimpleRng::new(1)).unwrap();
    ///
    /// let kernel = layer.kernel().unwrap();
    /// assert_eq!(kernel.shape(), &[3, 3, 1, 2]);
    /// assert!(kernel.iter().all(|&k| k == 0.25));
    /// ```
    pub fn with_kernel_init(mut self, init: impl Initializer + 'static) -> Self {
        self.kernel_init = Box::new(init);
        self
    }

    /// Replace the bias initializer (zeros by default).
    ///
    /// # Arguments
    ///
    /// * `init` - Initializer for the `[filters]` bias vector
    pub fn with_bias_init(mut self, init: impl Initializer + 'static) -> Self {
        self.bias_init = Box::new(init);
        self
    }

    pub fn filters(&self) -> usize {
        self.filters
    }

    pub fn kernel_size(&self) -> (usize, usize) {
        self.kernel_size
    }

    pub fn padding(&self) -> Padding {
        self.padding
    }

    pub fn kernel(&self) -> Option<&Tensor> {
        self.params.as_ref().map(|p| &p.kernel)
    }

    pub fn bias(&self) -> Option<&Tensor> {
        self.params.as_ref().map(|p| &p.bias)
    }
}

impl Layer for Conv2DLayer {
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
        let (h, w, c) = match input {
            [h, w, c] => (*h, *w, *c),
            _ => {
                return Err(NetError::InvalidConfig(format!(
                    "{} expects a [height, width, channels] input shape, got {:?}",
                    self.display, input
                )))
            }
        };
        if self.filters == 0 {
            return Err(NetError::InvalidConfig(format!("{} needs at least one filter", self.display)));
        }
        let (kh, kw) = self.kernel_size;
        let (ho, wo) = conv2d_output_size(h, w, kh, kw, self.padding)?;

        let kernel_shape = [kh, kw, c, self.filters];
        let bias_shape = [self.filters];
        self.params = Some(ConvParams {
            kernel: self.kernel_init.initialize(&kernel_shape, rng),
            bias: self.bias_init.initialize(&bias_shape, rng),
            grad_kernel: Tensor::zeros(ndarray::IxDyn(&kernel_shape)),
            grad_bias: Tensor::zeros(ndarray::IxDyn(&bias_shape)),
        });
        self.cached_input = None;
        self.shapes.set_output(vec![ho, wo, self.filters]);
        Ok(())
    }

    fn forward(&mut self, x: &Tensor, _mode: Mode) -> NetResult<Tensor> {
        let (input, _) = self.shapes.require_ready(&self.display, "forward")?;
        check_conforms(x, input)?;
        let params = self
            .params
            .as_ref()
            .ok_or_else(|| NetError::uninitialized(&self.display, "forward"))?;

        let kernel = params
            .kernel
            .view()
            .into_dimensionality::<Ix4>()
            .map_err(|_| NetError::shape(&[0, 0, 0, 0], params.kernel.shape()))?;
        let bias = params
            .bias
            .view()
            .into_dimensionality::<Ix1>()
            .map_err(|_| NetError::shape(&[self.filters], params.bias.shape()))?;
        let x4 = to_nhwc(x)?;
        let y = conv2d_forward(x4.view(), kernel, bias, self.padding)?;

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

        let x4 = to_nhwc(cached)?;
        let dy4 = to_nhwc(dy)?;
        let kernel = params
            .kernel
            .view()
            .into_dimensionality::<Ix4>()
            .map_err(|_| NetError::shape(&[0, 0, 0, 0], params.kernel.shape()))?;
        let (dx, dk, db) = conv2d_backward(x4.view(), kernel, dy4.view(), self.padding)?;

        params.grad_kernel = dk.into_dyn();
        params.grad_bias = db.into_dyn();
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

impl TrainableLayer for Conv2DLayer {
    fn parameters(&self) -> Vec<&Tensor> {
        match &self.params {
            Some(p) => vec![&p.kernel, &p.bias],
            None => Vec::new(),
        }
    }

    fn gradients(&self) -> Vec<&Tensor> {
        match &self.params {
            Some(p) => vec![&p.grad_kernel, &p.grad_bias],
            None => Vec::new(),
        }
    }

    fn parameters_and_gradients(&mut self) -> Vec<(&mut Tensor, &Tensor)> {
        match &mut self.params {
            Some(p) => vec![(&mut p.kernel, &p.grad_kernel), (&mut p.bias, &p.grad_bias)],
            None => Vec::new(),
        }
    }
}
