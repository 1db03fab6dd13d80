//! Shared utilities for neural network implementations
//!
//! This module provides the seeded random number generator used by
//! initializers and dropout.

pub mod rng;

pub use rng::SimpleRng;
