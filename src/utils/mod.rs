//! # Utility Modules
//!
//! Supporting utilities for compression, logging, metrics, and timing.
//!
//! This module provides reusable utilities used throughout the protocol
//! implementation.
//!
//! ## Components
//! - **Compression**: LZ4 and Zstd with size limits and thresholds
//! - **Logging**: Structured logging configuration
//! - **Metrics**: Thread-safe observability counters
//! - **Timeout**: Async timeout wrappers and shared deadlines
//!
//! ## Security
//! - Decompression bomb protection (16MB limit)
//! - Length validation before allocation throughout the codec path

pub mod compression;
pub mod logging;
pub mod metrics;
pub mod timeout;

// Re-export public types for advanced users
pub use metrics::{global_metrics, Metrics, MetricsSnapshot};
