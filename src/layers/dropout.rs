//! Dropout layer implementation for regularization
//!
//! This module provides a DropoutLayer that randomly drops (sets to zero) a fraction
//! of input units during training to prevent overfitting. During inference, all units
//! are kept and outputs are passed through unchanged.

use crate::error::{NetError, NetResult};
use crate::layers::{Layer, LayerShapes, TrainingOnlyLayer};
use crate::tensor::{check_conforms, check_same_shape, Mode, Tensor};
use crate::utils::SimpleRng;

/// What the last forward pass left behind for `backward`.
#[derive(Debug, Clone)]
enum DropoutCache {
    Empty,
    /// Scaled keep mask: `1 / (1 - rate)` for kept units, `0` for dropped ones.
    Mask(Tensor),
    Inference,
}

/// Dropout layer for regularization.
///
/// During training, randomly sets a fraction of input units to zero with probability
/// `drop_rate`, and scales the remaining units by 1/(1-drop_rate) to maintain expected
/// values. During inference, passes inputs through unchanged.
///
/// The mask generator is forked from the RNG handed to `init()`, so a seeded
/// build reproduces the same masks.
///
/// # Example
///
/// ```
/// use neural_layers::layers::{DropoutLayer, Layer};
/// use neural_layers::tensor::{Mode, Tensor};
/// use neural_layers::utils::SimpleRng;
///
/// let mut layer = DropoutLayer::new(0.5);
/// layer.set_input_shape(&[128]);
/// layer.init(&mut SimpleRng::new(42)).unwrap();
///
/// let x = Tensor::ones(ndarray::IxDyn(&[1, 128]));
/// let y = layer.forward(&x, Mode::Inference).unwrap();
/// assert_eq!(y, x);
/// ```
#[derive(Debug, Clone)]
pub struct DropoutLayer {
    drop_rate: f32,
    display: String,
    shapes: LayerShapes,
    rng: SimpleRng,
    cache: DropoutCache,
}

impl DropoutLayer {
    /// Creates a new dropout layer with the given drop rate.
    ///
    /// # Panics
    ///
    /// If `drop_rate` is outside `[0.0, 1.0)`.
    pub fn new(drop_rate: f32) -> Self {
        assert!(
            (0.0..1.0).contains(&drop_rate),
            "drop_rate must be in range [0.0, 1.0)"
        );

        Self {
            drop_rate,
            display: "Dropout".to_string(),
            shapes: LayerShapes::new(),
            rng: SimpleRng::new(0),
            cache: DropoutCache::Empty,
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = display.into();
        self
    }

    /// The probability that each unit is dropped during training.
    pub fn drop_rate(&self) -> f32 {
        self.drop_rate
    }
}

impl Layer for DropoutLayer {
    fn display(&self) -> &str {
        &self.display
    }

    fn shapes(&self) -> &LayerShapes {
        &self.shapes
    }

    fn shapes_mut(&mut self) -> &mut LayerShapes {
        &mut self.shapes
    }

    fn init(&mut self, rng: &mut SimpleRng) -> NetResult<()> {
        let input = self.shapes.require_input(&self.display)?.to_vec();
        self.shapes.set_output(input);
        self.rng = rng.fork();
        self.cache = DropoutCache::Empty;
        Ok(())
    }

    fn forward(&mut self, x: &Tensor, mode: Mode) -> NetResult<Tensor> {
        match mode {
            Mode::Training => self.forward_training(x),
            Mode::Inference => self.forward_inference(x),
        }
    }

    fn backward(&mut self, dy: &Tensor) -> NetResult<Tensor> {
        match std::mem::replace(&mut self.cache, DropoutCache::Empty) {
            DropoutCache::Mask(mask) => {
                if let Err(err) = check_same_shape(&mask, dy) {
                    self.cache = DropoutCache::Mask(mask);
                    return Err(err);
                }
                Ok(dy * &mask)
            }
            DropoutCache::Inference => Err(NetError::UnsupportedOperation {
                layer: self.display.clone(),
                operation: "backward (inference mode)",
            }),
            DropoutCache::Empty => Err(NetError::uninitialized(&self.display, "backward")),
        }
    }
}

impl TrainingOnlyLayer for DropoutLayer {
    fn forward_training(&mut self, x: &Tensor) -> NetResult<Tensor> {
        let (input, _) = self.shapes.require_ready(&self.display, "forward")?;
        check_conforms(x, input)?;

        // Draws lie in [0, 1): keeping on `>= rate` keeps every unit at rate 0
        let scale = 1.0 / (1.0 - self.drop_rate);
        let rate = self.drop_rate;
        let rng = &mut self.rng;
        let mask = Tensor::from_shape_simple_fn(x.raw_dim(), || {
            if rng.next_f32() >= rate {
                scale
            } else {
                0.0
            }
        });

        let y = x * &mask;
        self.cache = DropoutCache::Mask(mask);
        Ok(y)
    }

    fn forward_inference(&mut self, x: &Tensor) -> NetResult<Tensor> {
        let (input, _) = self.shapes.require_ready(&self.display, "forward")?;
        check_conforms(x, input)?;
        self.cache = DropoutCache::Inference;
        Ok(x.clone())
    }
}
