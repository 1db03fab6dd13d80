//! Layer trait definitions
//!
//! Every stage of a pipeline implements [`Layer`]: forward, backward, shape
//! inference through `init()`, and a display name. Two refinements add the
//! capabilities some layers need on top of that contract:
//!
//! - [`TrainableLayer`] for layers that own parameters and expose them, with
//!   their gradients, to an optimizer;
//! - [`TrainingOnlyLayer`] for layers whose behaviour differs between
//!   training and inference (dropout).
//!
//! Activation layers are covered by the generic
//! [`ActivationLayer`](crate::layers::ActivationLayer) rather than a trait.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --set_input_shape--> ShapeAssigned --init--> Ready
//!                                                  Ready: forward -> backward -> forward ...
//! ```
//!
//! `forward` and `backward` on a layer that is not `Ready` fail with
//! `UninitializedAccess`; `init` without an input shape fails the same way.

use crate::error::{NetError, NetResult};
use crate::tensor::{Mode, Shape, Tensor};
use crate::utils::SimpleRng;

/// Input and output shape of one layer.
///
/// The input shape is assigned by whoever assembles the pipeline; the output
/// shape is written only by `init()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerShapes {
    input: Option<Shape>,
    output: Option<Shape>,
}

impl LayerShapes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> Option<&[usize]> {
        self.input.as_deref()
    }

    pub fn output(&self) -> Option<&[usize]> {
        self.output.as_deref()
    }

    /// Assign a new input shape. The output shape is cleared, so the layer
    /// is back in `ShapeAssigned` until `init()` runs again.
    pub fn set_input(&mut self, shape: Shape) {
        self.input = Some(shape);
        self.output = None;
    }

    /// Record the output shape; only `init()` implementations call this.
    pub fn set_output(&mut self, shape: Shape) {
        self.output = Some(shape);
    }

    /// The input shape, or `UninitializedAccess` if none was assigned.
    pub fn require_input(&self, layer: &str) -> NetResult<&[usize]> {
        self.input()
            .ok_or_else(|| NetError::uninitialized(layer, "init"))
    }

    /// Both shapes, or `UninitializedAccess` if `init()` has not run.
    pub fn require_ready(&self, layer: &str, operation: &'static str) -> NetResult<(&[usize], &[usize])> {
        match (self.input(), self.output()) {
            (Some(input), Some(output)) => Ok((input, output)),
            _ => Err(NetError::uninitialized(layer, operation)),
        }
    }
}

/// Core trait for neural network layers.
///
/// Tensors passed to `forward` carry a leading batch axis followed by the
/// layer's input shape; `backward` receives a gradient shaped like the last
/// forward output and returns one shaped like the last forward input.
pub trait Layer {
    /// Human-readable name, defaulting to the layer type's name.
    fn display(&self) -> &str;

    fn shapes(&self) -> &LayerShapes;

    fn shapes_mut(&mut self) -> &mut LayerShapes;

    /// Number of trainable scalars owned by the layer.
    fn params(&self) -> usize {
        0
    }

    fn input_shape(&self) -> Option<&[usize]> {
        self.shapes().input()
    }

    /// Only meaningful once `init()` has run.
    fn output_shape(&self) -> Option<&[usize]> {
        self.shapes().output()
    }

    /// Assign the input shape. Any shape derived by an earlier `init()` is
    /// discarded, so `forward` fails with `UninitializedAccess` until the
    /// layer is initialized again.
    fn set_input_shape(&mut self, shape: &[usize]) {
        self.shapes_mut().set_input(shape.to_vec());
    }

    /// Derive the output shape (and allocate parameters) from the input shape.
    ///
    /// The default keeps the shape unchanged, which is what every
    /// elementwise layer needs. Layers that reshape override it.
    fn init(&mut self, _rng: &mut SimpleRng) -> NetResult<()> {
        let input = self.shapes().require_input(self.display())?.to_vec();
        self.shapes_mut().set_output(input);
        Ok(())
    }

    /// Transform a batch, caching whatever the matching `backward` needs.
    fn forward(&mut self, x: &Tensor, mode: Mode) -> NetResult<Tensor>;

    /// Gradient with respect to the last forward input, given `dy`.
    fn backward(&mut self, dy: &Tensor) -> NetResult<Tensor>;

    /// Access to owned parameters, for layers that have any.
    fn as_trainable(&self) -> Option<&dyn TrainableLayer> {
        None
    }

    fn as_trainable_mut(&mut self) -> Option<&mut dyn TrainableLayer> {
        None
    }
}

/// A layer that owns learnable parameters.
///
/// Parameters are exposed in a fixed slot order documented by each layer
/// (e.g. `0 = weights`, `1 = bias`). `gradients()` returns exactly one tensor
/// per parameter, in the same order and of the same shape, holding the
/// gradient computed by the most recent `backward` (zeros before the first).
/// Before `init()` both lists are empty.
pub trait TrainableLayer: Layer {
    fn parameters(&self) -> Vec<&Tensor>;

    fn gradients(&self) -> Vec<&Tensor>;

    /// Parameter/gradient pairs in slot order, for the optimizer.
    fn parameters_and_gradients(&mut self) -> Vec<(&mut Tensor, &Tensor)>;
}

/// Live count of scalars across a layer's owned parameters.
pub fn parameter_count(layer: &dyn TrainableLayer) -> usize {
    layer.parameters().iter().map(|p| p.len()).sum()
}

/// A layer that only acts during training.
///
/// `Layer::forward` dispatches on the caller-supplied [`Mode`]; the layer
/// never stores the mode itself. Backward is only defined after a training
/// forward.
pub trait TrainingOnlyLayer: Layer {
    fn forward_training(&mut self, x: &Tensor) -> NetResult<Tensor>;

    /// Inference behaviour, the identity unless a layer defines otherwise.
    fn forward_inference(&mut self, x: &Tensor) -> NetResult<Tensor> {
        Ok(x.clone())
    }
}
