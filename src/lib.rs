//! Neural Layers Library
//!
//! A small neural-network core: layers with hand-derived forward and backward
//! passes, activations, losses, initializers and optimizers, composed into a
//! trainable [`Sequential`](model::Sequential) pipeline.
//!
//! # Modules
//!
//! - `layers`: Layer traits and implementations (Dense, Conv2D, pooling, Dropout, activations)
//! - `kernels`: Convolution and pooling numeric kernels
//! - `losses`: Loss functions and their derivatives
//! - `initializers`: Parameter initialization strategies
//! - `optimizers`: Optimizer trait and implementations (SGD, Momentum, Adam)
//! - `model`: Sequential pipeline and training step
//! - `tensor`: Tensor alias, shapes and execution mode
//! - `error`: Error type shared by every module
//! - `utils`: Shared utilities (RNG)
//! - `config`: Training configuration structures
//! - `architecture`: Architecture configuration and model building

pub mod architecture;
pub mod config;
pub mod error;
pub mod initializers;
pub mod kernels;
pub mod layers;
pub mod losses;
pub mod model;
pub mod optimizers;
pub mod tensor;
pub mod utils;

#[cfg(feature = "blas")]
extern crate blas_src;

pub use error::{NetError, NetResult};
pub use model::Sequential;
pub use tensor::{Mode, Shape, Tensor};
