//! Flatten layer: reshapes each sample to a single feature axis.

use crate::error::{NetError, NetResult};
use crate::layers::{Layer, LayerShapes};
use crate::tensor::{check_conforms, element_count, Mode, Tensor};
use crate::utils::SimpleRng;

/// Collapses `[d0, d1, ...]` samples into `[d0 * d1 * ...]`, row-major.
///
/// Used between convolutional features and a [`DenseLayer`](crate::layers::DenseLayer).
#[derive(Debug, Clone)]
pub struct FlattenLayer {
    display: String,
    shapes: LayerShapes,
    /// Batch size of the last training or inference forward.
    cached_batch: Option<usize>,
}

impl FlattenLayer {
    /// # Example
    ///
    /// ```
    /// use neural_layers::layers::{FlattenLayer, Layer};
    /// use neural_layers::utils::SimpleRng;
    ///
    /// let mut flatten = FlattenLayer::new();
    /// flatten.set_input_shape(&[7, 7, 16]);
    /// flatten.init(&mut SimpleRng::new(1)).unwrap();
    /// assert_eq!(flatten.output_shape(), Some(&[7 * 7 * 16][..]));
    /// ```
    pub fn new() -> Self {
        Self {
            display: "Flatten".to_string(),
            shapes: LayerShapes::new(),
            cached_batch: None,
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = display.into();
        self
    }
}

impl Default for FlattenLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Layer for FlattenLayer {
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
        let features = element_count(self.shapes.require_input(&self.display)?);
        self.shapes.set_output(vec![features]);
        self.cached_batch = None;
        Ok(())
    }

    fn forward(&mut self, x: &Tensor, _mode: Mode) -> NetResult<Tensor> {
        let (input, output) = self.shapes.require_ready(&self.display, "forward")?;
        check_conforms(x, input)?;
        let batch = x.shape()[0];
        let y = x
            .to_shape(ndarray::IxDyn(&[batch, output[0]]))
            .map(|view| view.to_owned())
            .map_err(|_| NetError::shape(&[batch, output[0]], x.shape()))?;
        self.cached_batch = Some(batch);
        Ok(y)
    }

    fn backward(&mut self, dy: &Tensor) -> NetResult<Tensor> {
        let (input, output) = self.shapes.require_ready(&self.display, "backward")?;
        let batch = self
            .cached_batch
            .ok_or_else(|| NetError::uninitialized(&self.display, "backward"))?;
        check_conforms(dy, output)?;
        if dy.shape()[0] != batch {
            return Err(NetError::shape(&[batch, output[0]], dy.shape()));
        }

        let mut target = Vec::with_capacity(input.len() + 1);
        target.push(batch);
        target.extend_from_slice(input);
        let dx = dy
            .to_shape(ndarray::IxDyn(&target))
            .map(|view| view.to_owned())
            .map_err(|_| NetError::shape(&target, dy.shape()))?;
        self.cached_batch = None;
        Ok(dx)
    }
}
