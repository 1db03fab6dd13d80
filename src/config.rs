//! Configuration structures for training
//!
//! This module provides the training configuration read from JSON files:
//! which optimizer and loss to use, their hyperparameters, and how long to
//! train.

use log::warn;
use serde::Deserialize;
use std::fs;

use crate::error::{NetError, NetResult};
use crate::losses::{BinaryCrossEntropy, CategoricalCrossEntropy, Loss, MeanSquaredError};
use crate::optimizers::{Adam, Momentum, Optimizer, SGD};

/// Configuration for training: optimizer, loss and their hyperparameters.
///
/// Optional fields fall back to the usual defaults (logged at `warn` level
/// when the chosen optimizer needs them):
///
/// - **sgd**: `learning_rate`
/// - **momentum**: `learning_rate`, `momentum` (default 0.9)
/// - **adam**: `learning_rate`, `beta1` (default 0.9), `beta2` (default 0.999),
///   `epsilon` (default 1e-8)
///
/// Loss is one of `mse`, `binary_cross_entropy`, `categorical_cross_entropy`.
///
/// # Example
///
/// ```json
/// {
///   "optimizer": "adam",
///   "learning_rate": 0.01,
///   "beta1": 0.9,
///   "loss": "mse",
///   "epochs": 2000,
///   "seed": 42
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    /// Optimizer type: "sgd", "momentum" or "adam"
    pub optimizer: String,

    pub learning_rate: f32,

    /// Velocity decay for the momentum optimizer
    pub momentum: Option<f32>,

    /// First-moment decay for Adam
    pub beta1: Option<f32>,

    /// Second-moment decay for Adam
    pub beta2: Option<f32>,

    /// Denominator guard for Adam
    pub epsilon: Option<f32>,

    /// Loss type: "mse", "binary_cross_entropy" or "categorical_cross_entropy"
    pub loss: String,

    /// Number of passes over the training data (default 1000)
    pub epochs: Option<usize>,

    /// Seed for parameter initialization and dropout masks (default 42)
    pub seed: Option<u64>,
}

const VALID_OPTIMIZERS: [&str; 3] = ["sgd", "momentum", "adam"];
const VALID_LOSSES: [&str; 3] = ["mse", "binary_cross_entropy", "categorical_cross_entropy"];

impl TrainingConfig {
    pub fn epochs(&self) -> usize {
        self.epochs.unwrap_or(1000)
    }

    pub fn seed(&self) -> u64 {
        self.seed.unwrap_or(42)
    }

    /// Instantiate the configured optimizer.
    pub fn build_optimizer(&self) -> NetResult<Box<dyn Optimizer>> {
        let lr = self.learning_rate;
        match self.optimizer.to_lowercase().as_str() {
            "sgd" => Ok(Box::new(SGD::new(lr))),
            "momentum" => {
                let momentum = self.momentum.unwrap_or_else(|| {
                    warn!("momentum not set, using 0.9");
                    0.9
                });
                Ok(Box::new(Momentum::new(lr, momentum)))
            }
            "adam" => {
                let beta1 = self.beta1.unwrap_or_else(|| {
                    warn!("beta1 not set, using 0.9");
                    0.9
                });
                let beta2 = self.beta2.unwrap_or_else(|| {
                    warn!("beta2 not set, using 0.999");
                    0.999
                });
                let epsilon = self.epsilon.unwrap_or_else(|| {
                    warn!("epsilon not set, using 1e-8");
                    1e-8
                });
                Ok(Box::new(Adam::new(lr, beta1, beta2, epsilon)))
            }
            other => Err(NetError::InvalidConfig(format!(
                "Invalid optimizer '{}'. Must be one of: {}",
                other,
                VALID_OPTIMIZERS.join(", ")
            ))),
        }
    }

    /// Instantiate the configured loss.
    pub fn build_loss(&self) -> NetResult<Box<dyn Loss>> {
        match self.loss.to_lowercase().as_str() {
            "mse" => Ok(Box::new(MeanSquaredError)),
            "binary_cross_entropy" => Ok(Box::new(BinaryCrossEntropy)),
            "categorical_cross_entropy" => Ok(Box::new(CategoricalCrossEntropy)),
            other => Err(NetError::InvalidConfig(format!(
                "Invalid loss '{}'. Must be one of: {}",
                other,
                VALID_LOSSES.join(", ")
            ))),
        }
    }
}

/// Loads a training configuration from a JSON file.
///
/// Reads the file at `path`, deserializes its JSON contents into a
/// `TrainingConfig` and validates it.
///
/// # Examples
///
/// ```no_run
/// use neural_layers::config::load_config;
///
/// let cfg = load_config("config/xor_adam.json").unwrap();
/// assert_eq!(cfg.optimizer, "adam");
/// ```
pub fn load_config(path: &str) -> NetResult<TrainingConfig> {
    let contents = fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse and validate a training configuration from a JSON string.
pub fn parse_config(json: &str) -> NetResult<TrainingConfig> {
    let config: TrainingConfig = serde_json::from_str(json)?;
    validate_config(&config)?;
    Ok(config)
}

fn invalid(msg: impl Into<String>) -> NetError {
    NetError::InvalidConfig(msg.into())
}

fn validate_config(config: &TrainingConfig) -> NetResult<()> {
    let optimizer = config.optimizer.to_lowercase();
    if !VALID_OPTIMIZERS.contains(&optimizer.as_str()) {
        return Err(invalid(format!(
            "Invalid optimizer '{}'. Must be one of: {}",
            config.optimizer,
            VALID_OPTIMIZERS.join(", ")
        )));
    }

    let loss = config.loss.to_lowercase();
    if !VALID_LOSSES.contains(&loss.as_str()) {
        return Err(invalid(format!(
            "Invalid loss '{}'. Must be one of: {}",
            config.loss,
            VALID_LOSSES.join(", ")
        )));
    }

    if !(config.learning_rate > 0.0) {
        return Err(invalid("learning_rate must be positive"));
    }

    if let Some(momentum) = config.momentum {
        if !(0.0..1.0).contains(&momentum) {
            return Err(invalid("momentum must be in range [0.0, 1.0)"));
        }
    }

    for (name, beta) in [("beta1", config.beta1), ("beta2", config.beta2)] {
        if let Some(beta) = beta {
            if !(0.0..1.0).contains(&beta) {
                return Err(invalid(format!("{} must be in range [0.0, 1.0)", name)));
            }
        }
    }

    if let Some(epsilon) = config.epsilon {
        if !(epsilon > 0.0) {
            return Err(invalid("epsilon must be positive"));
        }
    }

    if config.epochs == Some(0) {
        return Err(invalid("epochs must be at least 1"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let cfg = parse_config(r#"{"optimizer": "sgd", "learning_rate": 0.1, "loss": "mse"}"#).unwrap();
        assert_eq!(cfg.epochs(), 1000);
        assert_eq!(cfg.seed(), 42);
        assert_eq!(cfg.build_loss().unwrap().name(), "MeanSquaredError");
        assert_eq!(cfg.build_optimizer().unwrap().learning_rate(), 0.1);
    }

    #[test]
    fn test_names_are_case_insensitive() {
        let cfg = parse_config(r#"{"optimizer": "Adam", "learning_rate": 0.01, "loss": "MSE"}"#).unwrap();
        assert!(cfg.build_optimizer().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let cases = [
            r#"{"optimizer": "rmsprop", "learning_rate": 0.1, "loss": "mse"}"#,
            r#"{"optimizer": "sgd", "learning_rate": 0.1, "loss": "hinge"}"#,
            r#"{"optimizer": "sgd", "learning_rate": 0.0, "loss": "mse"}"#,
            r#"{"optimizer": "momentum", "learning_rate": 0.1, "momentum": 1.0, "loss": "mse"}"#,
            r#"{"optimizer": "adam", "learning_rate": 0.1, "beta2": -0.1, "loss": "mse"}"#,
            r#"{"optimizer": "adam", "learning_rate": 0.1, "epsilon": 0.0, "loss": "mse"}"#,
            r#"{"optimizer": "sgd", "learning_rate": 0.1, "loss": "mse", "epochs": 0}"#,
        ];
        for json in cases {
            assert!(
                matches!(parse_config(json), Err(NetError::InvalidConfig(_))),
                "accepted {}",
                json
            );
        }
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(parse_config("{"), Err(NetError::Json(_))));
    }
}
