//! Layer abstractions for neural networks
//!
//! This module provides the Layer trait and implementations for common layer types
//! used across different neural network architectures.

mod r#trait;
pub mod activation;
pub mod conv2d;
pub mod dense;
pub mod dropout;
pub mod flatten;
pub mod pooling;

// Re-export the layer traits for convenience
pub use r#trait::{parameter_count, Layer, LayerShapes, TrainableLayer, TrainingOnlyLayer};

pub use activation::{
    Activation, ActivationLayer, ELULayer, Elu, GELULayer, Gelu, LeakyReLULayer, LeakyRelu,
    ReLULayer, Relu, Sigmoid, SigmoidLayer, Swish, SwishLayer, Tanh, TanhLayer,
};
pub use conv2d::Conv2DLayer;
pub use dense::DenseLayer;
pub use dropout::DropoutLayer;
pub use flatten::FlattenLayer;
pub use pooling::{AvgPool2DLayer, MaxPool2DLayer};
