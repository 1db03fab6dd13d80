//! Error types for the neural_layers library.
//!
//! Shape and call-order violations are usage errors: they are reported to the
//! caller immediately and never recovered inside a layer, since a silently
//! patched shape would corrupt every gradient downstream.

use std::fmt;

/// All error conditions surfaced by layers, losses, optimisers and models.
#[derive(Debug)]
pub enum NetError {
    /// A tensor does not conform to the shape fixed at `init()` time.
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    /// `backward` before a matching `forward`, or any pass before `init()`.
    UninitializedAccess {
        layer: String,
        operation: &'static str,
    },
    /// A contract method was invoked on a layer that does not provide it.
    UnsupportedOperation {
        layer: String,
        operation: &'static str,
    },
    /// A configuration or assembly request that cannot be honoured.
    InvalidConfig(String),
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl NetError {
    pub(crate) fn shape(expected: &[usize], actual: &[usize]) -> Self {
        NetError::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }

    pub(crate) fn uninitialized(layer: &str, operation: &'static str) -> Self {
        NetError::UninitializedAccess {
            layer: layer.to_string(),
            operation,
        }
    }
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::ShapeMismatch { expected, actual } => {
                write!(f, "Shape mismatch: expected {:?}, got {:?}.", expected, actual)
            }
            NetError::UninitializedAccess { layer, operation } => {
                write!(
                    f,
                    "Uninitialized access: `{}` called on layer '{}' before its prerequisites ran.",
                    operation, layer
                )
            }
            NetError::UnsupportedOperation { layer, operation } => {
                write!(
                    f,
                    "Unsupported operation: layer '{}' does not implement `{}`.",
                    layer, operation
                )
            }
            NetError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            NetError::Io(err) => write!(f, "I/O error: {}", err),
            NetError::Json(err) => write!(f, "JSON error: {}", err),
        }
    }
}

impl std::error::Error for NetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NetError::Io(err) => Some(err),
            NetError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for NetError {
    fn from(err: std::io::Error) -> Self {
        NetError::Io(err)
    }
}

impl From<serde_json::Error> for NetError {
    fn from(err: serde_json::Error) -> Self {
        NetError::Json(err)
    }
}

pub type NetResult<T> = Result<T, NetError>;
