//! Cache Codec Implementations
//!
//! This module provides built-in implementations of the [`CacheCodec`](crate::traits::CacheCodec) trait
//! used by backends that store values outside the process.

mod json;
pub use json::JsonCodec;
