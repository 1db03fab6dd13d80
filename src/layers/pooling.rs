//! Spatial pooling layers
//!
//! Both layers downsample `[height, width, channels]` inputs with
//! non-overlapping windows and own no parameters.

use crate::error::{NetError, NetResult};
use crate::kernels::{
    avg_pool2d_backward, avg_pool2d_forward, max_pool2d_backward, max_pool2d_forward,
    pool_output_size,
};
use crate::layers::{Layer, LayerShapes};
use crate::tensor::{check_conforms, to_nhwc, Mode, Tensor};
use crate::utils::SimpleRng;

/// Output shape shared by both pooling layers.
fn pooled_shape(display: &str, input: &[usize], pool: (usize, usize)) -> NetResult<Vec<usize>> {
    match input {
        [h, w, c] => {
            let (ho, wo) = pool_output_size(*h, *w, pool.0, pool.1)?;
            Ok(vec![ho, wo, *c])
        }
        _ => Err(NetError::InvalidConfig(format!(
            "{} expects a [height, width, channels] input shape, got {:?}",
            display, input
        ))),
    }
}

/// Max pooling. Backward routes each gradient to the first maximal element of
/// its window.
#[derive(Debug, Clone)]
pub struct MaxPool2DLayer {
    pool_size: (usize, usize),
    display: String,
    shapes: LayerShapes,
    cached_input: Option<Tensor>,
}

impl MaxPool2DLayer {
    /// Create a max pooling layer over non-overlapping windows.
    ///
    /// # Arguments
    ///
    /// * `pool_size` - Window `(height, width)`; it is also the stride
    ///
    /// # Example
    ///
    /// ```
    /// use neural_layers::layers::{Layer, MaxPool2DLayer};
    /// use neural_layers::utils::SimpleRng;
    ///
    /// let mut pool = MaxPool2DLayer::new((2, 2));
    /// pool.set_input_shape(&[28, 28, 8]);
    /// pool.init(&mut SimpleRng::new(1)).unwrap();
    /// assert_eq!(pool.output_shape(), Some(&[14, 14, 8][..]));
    /// ```
    ///
    /// Trailing rows and columns that do not fill a window are dropped.
    pub fn new(pool_size: (usize, usize)) -> Self {
        Self {
            pool_size,
            display: "MaxPool2D".to_string(),
            shapes: LayerShapes::new(),
            cached_input: None,
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = display.into();
        self
    }

    pub fn pool_size(&self) -> (usize, usize) {
        self.pool_size
    }
}

impl Layer for MaxPool2DLayer {
    fn display(&self) -> &str {
        &self.display
    }

    fn shapes(&self) -> &LayerShapes {
        &self.shapes
    }

    fn shapes_mut(&mut self) -> &mut LayerShapes {
        &mut self.shapes
    }

    fn init(&mut self, _rng: &mut SimpleRng) -> NetResult<()> {
        let input = self.shapes.require_input(&self.display)?;
        let output = pooled_shape(&self.display, input, self.pool_size)?;
        self.shapes.set_output(output);
        self.cached_input = None;
        Ok(())
    }

    fn forward(&mut self, x: &Tensor, _mode: Mode) -> NetResult<Tensor> {
        let (input, _) = self.shapes.require_ready(&self.display, "forward")?;
        check_conforms(x, input)?;
        let (ph, pw) = self.pool_size;
        let y = max_pool2d_forward(to_nhwc(x)?.view(), ph, pw)?;
        self.cached_input = Some(x.clone());
        Ok(y.into_dyn())
    }

    fn backward(&mut self, dy: &Tensor) -> NetResult<Tensor> {
        let cached = self
            .cached_input
            .as_ref()
            .ok_or_else(|| NetError::uninitialized(&self.display, "backward"))?;
        let (ph, pw) = self.pool_size;
        let dx = max_pool2d_backward(to_nhwc(cached)?.view(), to_nhwc(dy)?.view(), ph, pw)?;
        self.cached_input = None;
        Ok(dx.into_dyn())
    }
}

/// Average pooling. Backward spreads each gradient evenly over its window.
#[derive(Debug, Clone)]
pub struct AvgPool2DLayer {
    pool_size: (usize, usize),
    display: String,
    shapes: LayerShapes,
    cached_input: Option<Tensor>,
}

impl AvgPool2DLayer {
    /// Create an average pooling layer; `pool_size` is both window and stride.
    pub fn new(pool_size: (usize, usize)) -> Self {
        Self {
            pool_size,
            display: "AvgPool2D".to_string(),
            shapes: LayerShapes::new(),
            cached_input: None,
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = display.into();
        self
    }

    pub fn pool_size(&self) -> (usize, usize) {
        self.pool_size
    }
}

impl Layer for AvgPool2DLayer {
    fn display(&self) -> &str {
        &self.display
    }

    fn shapes(&self) -> &LayerShapes {
        &self.shapes
    }

    fn shapes_mut(&mut self) -> &mut LayerShapes {
        &mut self.shapes
    }

    fn init(&mut self, _rng: &mut SimpleRng) -> NetResult<()> {
        let input = self.shapes.require_input(&self.display)?;
        let output = pooled_shape(&self.display, input, self.pool_size)?;
        self.shapes.set_output(output);
        self.cached_input = None;
        Ok(())
    }

    fn forward(&mut self, x: &Tensor, _mode: Mode) -> NetResult<Tensor> {
        let (input, _) = self.shapes.require_ready(&self.display, "forward")?;
        check_conforms(x, input)?;
        let (ph, pw) = self.pool_size;
        let y = avg_pool2d_forward(to_nhwc(x)?.view(), ph, pw)?;
        // Only the input's shape matters for the average gradient
        self.cached_input = Some(x.clone());
        Ok(y.into_dyn())
    }

    fn backward(&mut self, dy: &Tensor) -> NetResult<Tensor> {
        let cached = self
            .cached_input
            .as_ref()
            .ok_or_else(|| NetError::uninitialized(&self.display, "backward"))?;
        let (ph, pw) = self.pool_size;
        let dx = avg_pool2d_backward(to_nhwc(cached)?.view(), to_nhwc(dy)?.view(), ph, pw)?;
        self.cached_input = None;
        Ok(dx.into_dyn())
    }
}
