//! Activation layers
//!
//! An activation layer owns no parameters. It applies an elementwise function
//! on the way forward and multiplies the upstream gradient by the function's
//! derivative on the way back (the chain rule for an elementwise map). The
//! derivative is evaluated at the cached forward input, never at the output.
//!
//! All activation layers are the one generic [`ActivationLayer`]
//! parameterised by an [`Activation`]; the aliases at the bottom of this file
//! name the common ones.

use crate::error::{NetError, NetResult};
use crate::layers::{Layer, LayerShapes};
use crate::tensor::{check_conforms, check_same_shape, Mode, Tensor};

/// An elementwise nonlinearity and its derivative.
///
/// Implementors provide the scalar function and derivative; `func` and
/// `func_prime` lift them over a whole tensor and may be overridden when a
/// vectorised form is cheaper.
pub trait Activation {
    /// Default display name of layers built from this activation.
    const NAME: &'static str;

    fn apply(&self, x: f32) -> f32;

    /// Derivative with respect to the input `x`.
    fn derivative(&self, x: f32) -> f32;

    fn func(&self, x: &Tensor) -> Tensor {
        x.mapv(|v| self.apply(v))
    }

    fn func_prime(&self, x: &Tensor) -> Tensor {
        x.mapv(|v| self.derivative(v))
    }
}

/// Layer wrapper caching its input between `forward` and `backward`.
#[derive(Debug, Clone)]
pub struct ActivationLayer<A: Activation> {
    activation: A,
    display: String,
    shapes: LayerShapes,
    cached_input: Option<Tensor>,
}

impl<A: Activation> ActivationLayer<A> {
    pub fn new(activation: A) -> Self {
        Self {
            activation,
            display: A::NAME.to_string(),
            shapes: LayerShapes::new(),
            cached_input: None,
        }
    }

    /// Replace the default display name.
    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = display.into();
        self
    }

    pub fn activation(&self) -> &A {
        &self.activation
    }

    /// Input of the last `forward`, until the matching `backward` consumes it.
    pub fn cached_input(&self) -> Option<&Tensor> {
        self.cached_input.as_ref()
    }
}

impl<A: Activation + Default> Default for ActivationLayer<A> {
    fn default() -> Self {
        Self::new(A::default())
    }
}

impl<A: Activation> Layer for ActivationLayer<A> {
    fn display(&self) -> &str {
        &self.display
    }

    fn shapes(&self) -> &LayerShapes {
        &self.shapes
    }

    fn shapes_mut(&mut self) -> &mut LayerShapes {
        &mut self.shapes
    }

    fn forward(&mut self, x: &Tensor, _mode: Mode) -> NetResult<Tensor> {
        let (input, _) = self.shapes.require_ready(&self.display, "forward")?;
        check_conforms(x, input)?;
        let y = self.activation.func(x);
        self.cached_input = Some(x.clone());
        Ok(y)
    }

    fn backward(&mut self, dy: &Tensor) -> NetResult<Tensor> {
        let cached = self
            .cached_input
            .as_ref()
            .ok_or_else(|| NetError::uninitialized(&self.display, "backward"))?;
        check_same_shape(cached, dy)?;
        let dx = dy * &self.activation.func_prime(cached);
        self.cached_input = None;
        Ok(dx)
    }
}

/// `max(0, x)`; the derivative at 0 is taken as 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct Relu;

impl Activation for Relu {
    const NAME: &'static str = "ReLU";

    fn apply(&self, x: f32) -> f32 {
        x.max(0.0)
    }

    fn derivative(&self, x: f32) -> f32 {
        if x > 0.0 {
            1.0
        } else {
            0.0
        }
    }
}

/// `x` for positive inputs, `alpha * x` otherwise.
#[derive(Debug, Clone, Copy)]
pub struct LeakyRelu {
    pub alpha: f32,
}

impl Default for LeakyRelu {
    fn default() -> Self {
        Self { alpha: 0.01 }
    }
}

impl Activation for LeakyRelu {
    const NAME: &'static str = "LeakyReLU";

    fn apply(&self, x: f32) -> f32 {
        if x > 0.0 {
            x
        } else {
            self.alpha * x
        }
    }

    fn derivative(&self, x: f32) -> f32 {
        if x > 0.0 {
            1.0
        } else {
            self.alpha
        }
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sigmoid;

impl Activation for Sigmoid {
    const NAME: &'static str = "Sigmoid";

    fn apply(&self, x: f32) -> f32 {
        sigmoid(x)
    }

    fn derivative(&self, x: f32) -> f32 {
        let s = sigmoid(x);
        s * (1.0 - s)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Tanh;

impl Activation for Tanh {
    const NAME: &'static str = "Tanh";

    fn apply(&self, x: f32) -> f32 {
        x.tanh()
    }

    fn derivative(&self, x: f32) -> f32 {
        let t = x.tanh();
        1.0 - t * t
    }
}

/// `x` for positive inputs, `alpha * (e^x - 1)` otherwise.
#[derive(Debug, Clone, Copy)]
pub struct Elu {
    pub alpha: f32,
}

impl Default for Elu {
    fn default() -> Self {
        Self { alpha: 1.0 }
    }
}

impl Activation for Elu {
    const NAME: &'static str = "ELU";

    fn apply(&self, x: f32) -> f32 {
        if x > 0.0 {
            x
        } else {
            self.alpha * (x.exp() - 1.0)
        }
    }

    fn derivative(&self, x: f32) -> f32 {
        if x > 0.0 {
            1.0
        } else {
            self.alpha * x.exp()
        }
    }
}

const GELU_K: f32 = 0.797_884_6; // sqrt(2 / pi)
const GELU_C: f32 = 0.044_715;

/// GELU, tanh approximation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gelu;

impl Activation for Gelu {
    const NAME: &'static str = "GELU";

    fn apply(&self, x: f32) -> f32 {
        let inner = GELU_K * (x + GELU_C * x * x * x);
        0.5 * x * (1.0 + inner.tanh())
    }

    fn derivative(&self, x: f32) -> f32 {
        let inner = GELU_K * (x + GELU_C * x * x * x);
        let t = inner.tanh();
        let d_inner = GELU_K * (1.0 + 3.0 * GELU_C * x * x);
        0.5 * (1.0 + t) + 0.5 * x * (1.0 - t * t) * d_inner
    }
}

/// `x * sigmoid(x)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Swish;

impl Activation for Swish {
    const NAME: &'static str = "Swish";

    fn apply(&self, x: f32) -> f32 {
        x * sigmoid(x)
    }

    fn derivative(&self, x: f32) -> f32 {
        let s = sigmoid(x);
        s + x * s * (1.0 - s)
    }
}

pub type ReLULayer = ActivationLayer<Relu>;
pub type LeakyReLULayer = ActivationLayer<LeakyRelu>;
pub type SigmoidLayer = ActivationLayer<Sigmoid>;
pub type TanhLayer = ActivationLayer<Tanh>;
pub type ELULayer = ActivationLayer<Elu>;
pub type GELULayer = ActivationLayer<Gelu>;
pub type SwishLayer = ActivationLayer<Swish>;
