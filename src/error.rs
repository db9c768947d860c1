//! # Error Types
//!
//! Comprehensive error handling for the registry protocol.
//!
//! This module defines all error variants that can occur during protocol
//! operations, from low-level I/O errors to high-level protocol violations.
//!
//! ## Error Categories
//! - **I/O Errors**: Network and file system failures
//! - **Codec Errors**: Unknown payload types, envelope failures, oversized bodies
//! - **Sync Errors**: Registry packing failures, negotiation state violations
//! - **Compression Errors**: Decompression failures, size limit violations
//!
//! Reference cycles found during validation are *not* errors: the
//! validation walk accumulates them as structured problems instead
//! (see [`crate::sync::validation`]).
//!
//! All errors implement `std::error::Error` for interoperability.

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
/// Static strings are borrowed, avoiding heap allocations for common error cases.
pub mod constants {
    /// Protocol validation errors
    pub const ERR_INVALID_HEADER: &str = "Invalid protocol header";
    pub const ERR_OVERSIZED_PACKET: &str = "Packet exceeds maximum size";
    pub const ERR_TRAILING_BYTES: &str = "Trailing bytes after payload decode";
    pub const ERR_TRUNCATED_PAYLOAD: &str = "Payload ended before all fields were read";

    /// Resource identifier errors
    pub const ERR_EMPTY_RESOURCE_ID: &str = "Resource id cannot be empty";
    pub const ERR_BAD_NAMESPACE: &str = "Invalid character in resource id namespace";
    pub const ERR_BAD_PATH: &str = "Invalid character in resource id path";

    /// Envelope dispatch errors
    pub const ERR_PAYLOAD_TYPE_MISMATCH: &str = "Payload value does not match registered type";
    pub const ERR_ENCODING: &str = "encoding";
    pub const ERR_DECODING: &str = "decoding";

    /// Negotiation state errors
    pub const ERR_TASK_NOT_STARTED: &str = "Sync task has not been started";
    pub const ERR_TASK_ALREADY_STARTED: &str = "Sync task was already started";
    pub const ERR_RESPONSE_AFTER_DONE: &str = "Known-packs response received after sync completed";
    pub const ERR_RESPONSE_NOT_AWAITED: &str =
        "Known-packs response received outside AwaitingKnownPacks state";

    /// Connection errors
    pub const ERR_CONNECTION_CLOSED: &str = "Connection closed";
    pub const ERR_TIMEOUT: &str = "Operation timed out";
}

/// `ProtocolError` is the primary error type for all protocol operations.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Deserialize error: {0}")]
    DeserializeError(String),

    #[error("Invalid resource id: {0}")]
    InvalidResourceId(String),

    #[error("No codec registered for payload type '{0}'")]
    UnknownPayloadType(String),

    #[error("Payload type '{0}' registered twice")]
    DuplicatePayloadType(String),

    #[error("{op} payload '{type_id}' failed: {source}")]
    PayloadEnvelope {
        /// High-level operation name: "encoding" or "decoding".
        op: &'static str,
        type_id: String,
        #[source]
        source: Box<ProtocolError>,
    },

    #[error("Fallback payload of {size} bytes exceeds bound of {max} bytes")]
    OversizedPayload { size: usize, max: usize },

    #[error("Failed to pack entry '{entry}' of registry '{registry}': {source}")]
    RegistrySync {
        registry: String,
        entry: String,
        #[source]
        source: Box<ProtocolError>,
    },

    #[error("Protocol state violation: {0}")]
    ProtocolState(String),

    #[error("Unexpected message type")]
    UnexpectedMessage,

    #[error("Invalid protocol header")]
    InvalidHeader,

    #[error("Unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    #[error("Packet too large: {0} bytes")]
    OversizedPacket(usize),

    #[error("Compression failed")]
    CompressionFailure,

    #[error("Decompression failed")]
    DecompressionFailure,

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timeout occurred")]
    Timeout,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Custom error: {0}")]
    Custom(String),
}

impl ProtocolError {
    /// Wrap an error with the payload type id and operation name,
    /// preserving the original cause for diagnosability.
    pub fn in_envelope(self, op: &'static str, type_id: impl ToString) -> Self {
        ProtocolError::PayloadEnvelope {
            op,
            type_id: type_id.to_string(),
            source: Box::new(self),
        }
    }

    /// Wrap an error with the registry and entry it occurred in.
    pub fn in_registry(self, registry: impl ToString, entry: impl ToString) -> Self {
        ProtocolError::RegistrySync {
            registry: registry.to_string(),
            entry: entry.to_string(),
            source: Box::new(self),
        }
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
