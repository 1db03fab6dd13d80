//! Numeric kernels consumed by the convolution and pooling layers.
//!
//! The layers only see these functions; they own no loop nests themselves.
//! All kernels operate on 4-D channels-last arrays `(batch, height, width,
//! channels)` and return fresh arrays.

pub mod conv;
pub mod pool;

pub use conv::{conv2d_backward, conv2d_forward, conv2d_output_size, Padding};
pub use pool::{
    avg_pool2d_backward, avg_pool2d_forward, max_pool2d_backward, max_pool2d_forward,
    pool_output_size,
};
