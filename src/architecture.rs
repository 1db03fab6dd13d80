//! Architecture configuration structures
//!
//! This module provides configuration structures for defining neural network architectures
//! via JSON configuration files. This enables architecture experimentation without code changes.
//!
//! Only per-layer hyperparameters are configured; every input shape after the
//! first is inferred when the model is built.

use serde::Deserialize;
use std::fs;

use crate::error::{NetError, NetResult};
use crate::kernels::Padding;
use crate::layers::{
    AvgPool2DLayer, Conv2DLayer, DenseLayer, DropoutLayer, ELULayer, Elu, FlattenLayer,
    GELULayer, Layer, LeakyReLULayer, LeakyRelu, MaxPool2DLayer, ReLULayer, SigmoidLayer,
    SwishLayer, TanhLayer,
};
use crate::model::Sequential;
use crate::utils::SimpleRng;

/// Configuration for a single layer in the neural network.
///
/// Defines the layer type and its parameters. Different layer types require different fields:
///
/// - **dense**: Requires `units`
/// - **conv2d**: Requires `filters` and `kernel_size`, optional `padding`
///   (`"same"` or `"valid"`, default `"valid"`)
/// - **max_pool2d** / **avg_pool2d**: Requires `pool_size`
/// - **flatten**: No parameters
/// - **dropout**: Requires `rate` (probability of dropping units, range [0.0, 1.0))
/// - **relu**, **sigmoid**, **tanh**, **gelu**, **swish**: No parameters
/// - **leaky_relu** / **elu**: Optional `alpha` (defaults 0.01 / 1.0)
///
/// Every layer accepts an optional `display` name.
///
/// # Examples
///
/// ```json
/// { "layer_type": "dense", "units": 512 }
/// ```
///
/// ```json
/// { "layer_type": "conv2d", "filters": 8, "kernel_size": 3, "padding": "same" }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    /// Type of layer, e.g. "dense", "conv2d", "max_pool2d", "relu"
    pub layer_type: String,

    /// Display name override
    pub display: Option<String>,

    /// Output width of a Dense layer
    pub units: Option<usize>,

    /// Number of Conv2D filters
    pub filters: Option<usize>,
    /// Square Conv2D kernel extent
    pub kernel_size: Option<usize>,
    /// Conv2D padding: "same" or "valid"
    pub padding: Option<String>,

    /// Square pooling window (also the stride)
    pub pool_size: Option<usize>,

    /// Dropout rate
    pub rate: Option<f32>,

    /// Slope or scale of LeakyReLU / ELU
    pub alpha: Option<f32>,
}

/// Configuration for the entire neural network architecture.
///
/// `input_shape` describes one sample (no batch axis). Layers are applied in
/// the order they appear in the configuration.
///
/// # Example
///
/// ```json
/// {
///   "input_shape": [28, 28, 1],
///   "layers": [
///     { "layer_type": "conv2d", "filters": 8, "kernel_size": 3, "padding": "same" },
///     { "layer_type": "relu" },
///     { "layer_type": "max_pool2d", "pool_size": 2 },
///     { "layer_type": "flatten" },
///     { "layer_type": "dropout", "rate": 0.2 },
///     { "layer_type": "dense", "units": 10 },
///     { "layer_type": "sigmoid" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ArchitectureConfig {
    pub input_shape: Vec<usize>,

    /// Sequence of layer configurations defining the network structure
    pub layers: Vec<LayerConfig>,
}

const LAYER_TYPES: [&str; 13] = [
    "dense",
    "conv2d",
    "max_pool2d",
    "avg_pool2d",
    "flatten",
    "dropout",
    "relu",
    "leaky_relu",
    "sigmoid",
    "tanh",
    "elu",
    "gelu",
    "swish",
];

/// Loads an architecture configuration from a JSON file.
///
/// Reads the file at `path`, deserializes its JSON contents into an
/// `ArchitectureConfig` and validates every layer entry.
///
/// # Examples
///
/// ```no_run
/// use neural_layers::architecture::load_architecture;
///
/// let arch = load_architecture("config/architectures/xor.json").unwrap();
/// assert!(!arch.layers.is_empty());
/// ```
pub fn load_architecture(path: &str) -> NetResult<ArchitectureConfig> {
    let contents = fs::read_to_string(path)?;
    parse_architecture(&contents)
}

/// Parse and validate an architecture from a JSON string.
pub fn parse_architecture(json: &str) -> NetResult<ArchitectureConfig> {
    let config: ArchitectureConfig = serde_json::from_str(json)?;
    validate_architecture(&config)?;
    Ok(config)
}

fn require<T>(value: Option<T>, index: usize, layer_type: &str, field: &str) -> NetResult<T> {
    value.ok_or_else(|| {
        NetError::InvalidConfig(format!(
            "Layer {}: {} layer requires '{}'",
            index, layer_type, field
        ))
    })
}

fn positive(value: usize, index: usize, field: &str) -> NetResult<usize> {
    if value == 0 {
        return Err(NetError::InvalidConfig(format!(
            "Layer {}: '{}' must be greater than 0",
            index, field
        )));
    }
    Ok(value)
}

fn parse_padding(value: Option<&str>, index: usize) -> NetResult<Padding> {
    match value.map(str::to_lowercase).as_deref() {
        None | Some("valid") => Ok(Padding::Valid),
        Some("same") => Ok(Padding::Same),
        Some(other) => Err(NetError::InvalidConfig(format!(
            "Layer {}: padding must be 'same' or 'valid', got '{}'",
            index, other
        ))),
    }
}

/// Validates an architecture configuration.
///
/// Checks that the architecture has at least one layer, that the input shape
/// is non-empty with non-zero extents, and that each layer has the required
/// fields for its type with values in range. Shape compatibility between
/// layers is checked when the model is built.
fn validate_architecture(config: &ArchitectureConfig) -> NetResult<()> {
    if config.layers.is_empty() {
        return Err(NetError::InvalidConfig(
            "Architecture must have at least one layer".to_string(),
        ));
    }
    if config.input_shape.is_empty() || config.input_shape.contains(&0) {
        return Err(NetError::InvalidConfig(format!(
            "input_shape must be non-empty with non-zero extents, got {:?}",
            config.input_shape
        )));
    }

    for (i, layer) in config.layers.iter().enumerate() {
        validate_layer(layer, i)?;
    }
    Ok(())
}

/// Validates a single layer configuration.
fn validate_layer(layer: &LayerConfig, index: usize) -> NetResult<()> {
    let layer_type = layer.layer_type.to_lowercase();

    match layer_type.as_str() {
        "dense" => {
            positive(require(layer.units, index, "Dense", "units")?, index, "units")?;
        }
        "conv2d" => {
            positive(require(layer.filters, index, "Conv2D", "filters")?, index, "filters")?;
            positive(require(layer.kernel_size, index, "Conv2D", "kernel_size")?, index, "kernel_size")?;
            parse_padding(layer.padding.as_deref(), index)?;
        }
        "max_pool2d" | "avg_pool2d" => {
            positive(require(layer.pool_size, index, "Pooling", "pool_size")?, index, "pool_size")?;
        }
        "dropout" => {
            let rate = require(layer.rate, index, "Dropout", "rate")?;
            if !(0.0..1.0).contains(&rate) {
                return Err(NetError::InvalidConfig(format!(
                    "Layer {}: Dropout rate must be in range [0.0, 1.0), got {}",
                    index, rate
                )));
            }
        }
        "leaky_relu" => {
            if let Some(alpha) = layer.alpha {
                if alpha < 0.0 {
                    return Err(NetError::InvalidConfig(format!(
                        "Layer {}: leaky_relu alpha must be non-negative",
                        index
                    )));
                }
            }
        }
        "elu" => {
            if let Some(alpha) = layer.alpha {
                if alpha <= 0.0 {
                    return Err(NetError::InvalidConfig(format!(
                        "Layer {}: elu alpha must be positive",
                        index
                    )));
                }
            }
        }
        "flatten" | "relu" | "sigmoid" | "tanh" | "gelu" | "swish" => {}
        _ => {
            return Err(NetError::InvalidConfig(format!(
                "Layer {}: Invalid layer type '{}'. Must be one of: {}",
                index,
                layer.layer_type,
                LAYER_TYPES.join(", ")
            )));
        }
    }
    Ok(())
}

/// Instantiate one configured layer, not yet initialized.
fn build_layer(config: &LayerConfig, index: usize) -> NetResult<Box<dyn Layer>> {
    validate_layer(config, index)?;

    macro_rules! named {
        ($layer:expr) => {
            match &config.display {
                Some(display) => Box::new($layer.with_display(display.clone())) as Box<dyn Layer>,
                None => Box::new($layer) as Box<dyn Layer>,
            }
        };
    }

    let layer = match config.layer_type.to_lowercase().as_str() {
        "dense" => named!(DenseLayer::new(require(config.units, index, "Dense", "units")?)),
        "conv2d" => {
            let filters = require(config.filters, index, "Conv2D", "filters")?;
            let k = require(config.kernel_size, index, "Conv2D", "kernel_size")?;
            let padding = parse_padding(config.padding.as_deref(), index)?;
            named!(Conv2DLayer::new(filters, (k, k), padding))
        }
        "max_pool2d" => {
            let p = require(config.pool_size, index, "Pooling", "pool_size")?;
            named!(MaxPool2DLayer::new((p, p)))
        }
        "avg_pool2d" => {
            let p = require(config.pool_size, index, "Pooling", "pool_size")?;
            named!(AvgPool2DLayer::new((p, p)))
        }
        "flatten" => named!(FlattenLayer::new()),
        "dropout" => named!(DropoutLayer::new(require(config.rate, index, "Dropout", "rate")?)),
        "relu" => named!(ReLULayer::default()),
        "leaky_relu" => match config.alpha {
            Some(alpha) => named!(LeakyReLULayer::new(LeakyRelu { alpha })),
            None => named!(LeakyReLULayer::default()),
        },
        "sigmoid" => named!(SigmoidLayer::default()),
        "tanh" => named!(TanhLayer::default()),
        "elu" => match config.alpha {
            Some(alpha) => named!(ELULayer::new(Elu { alpha })),
            None => named!(ELULayer::default()),
        },
        "gelu" => named!(GELULayer::default()),
        "swish" => named!(SwishLayer::default()),
        other => {
            return Err(NetError::InvalidConfig(format!(
                "Layer {}: Invalid layer type '{}'",
                index, other
            )))
        }
    };
    Ok(layer)
}

/// Builds a model from an architecture configuration.
///
/// Instantiates every layer in configuration order, then builds the
/// resulting [`Sequential`], which infers shapes and initializes parameters
/// from `rng`.
///
/// # Errors
///
/// Returns an error if a layer configuration is invalid or if consecutive
/// layers have incompatible shapes.
///
/// # Examples
///
/// ```
/// use neural_layers::architecture::{build_model, parse_architecture};
/// use neural_layers::utils::SimpleRng;
///
/// let config = parse_architecture(r#"{
///     "input_shape": [2],
///     "layers": [
///         { "layer_type": "dense", "units": 4 },
///         { "layer_type": "tanh" },
///         { "layer_type": "dense", "units": 1 }
///     ]
/// }"#).unwrap();
/// let mut rng = SimpleRng::new(42);
/// let model = build_model(&config, &mut rng).unwrap();
/// assert_eq!(model.len(), config.layers.len());
/// ```
pub fn build_model(config: &ArchitectureConfig, rng: &mut SimpleRng) -> NetResult<Sequential> {
    validate_architecture(config)?;
    let mut model = Sequential::new(config.input_shape.clone());
    for (i, layer_config) in config.layers.iter().enumerate() {
        model.add_boxed(build_layer(layer_config, i)?);
    }
    model.build(rng)?;
    Ok(model)
}
