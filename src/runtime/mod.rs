//! Zero-allocation, blazing-fast async runtime
//!
//! This module provides lock-free, zero-allocation async primitives optimized for
//! maximum performance with elegant ergonomic APIs.

pub mod channel;

pub use channel::*;
