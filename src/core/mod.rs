//! # Core Protocol Components
//!
//! Low-level packet handling, codecs, and binary serialization.
//!
//! This module provides the foundation for the protocol, handling packet
//! framing, wire primitives, and element value serialization.
//!
//! ## Components
//! - **Packet**: Binary packet format with magic bytes and flag-described payloads
//! - **Codec**: Tokio codec for framing over byte streams
//! - **Resource**: Namespaced identifiers used throughout the protocol
//! - **Wire**: Checked primitive read/write helpers
//! - **Serialization**: Format abstraction for registry element values
//!
//! ## Wire Format
//! ```text
//! [Magic(4)] [Version(1)] [Flags(1)] [Length(4)] [Payload(N)]
//! ```
//!
//! ## Security
//! - Maximum packet size: 16MB (prevents memory exhaustion)
//! - Magic bytes prevent accidental misinterpretation
//! - Length validation before allocation

pub mod codec;
pub mod packet;
pub mod resource;
pub mod serialization;
pub mod wire;
