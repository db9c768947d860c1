//! # Payload Type Registry
//!
//! Maps wire type identifiers to codecs and dispatches envelope
//! encode/decode through them.
//!
//! Registries are built once through [`PayloadTypeRegistryBuilder`] and are
//! immutable afterwards, so concurrent encode/decode from multiple tasks
//! requires no locking. Clientbound and serverbound registries are
//! independent namespaces: the same identifier may be bound to different
//! codecs in each direction.
//!
//! ## Decode lookup order
//! 1. the explicit per-call override map, if any
//! 2. the registry's own codec table
//! 3. the fallback provider, which discards unknown bodies up to a
//!    configured size bound
//!
//! Errors raised while encoding or decoding a body are wrapped with the
//! type identifier and the operation name, preserving the original cause.

use crate::core::resource::ResourceId;
use crate::core::wire;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::payload::{Envelope, ErasedCodec, PayloadCodec};
use crate::utils::metrics::global_metrics;
use bytes::{Buf, Bytes, BytesMut};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, trace};

/// Direction of a payload flow. Each direction is an independent codec
/// namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowDirection {
    /// Server to client.
    Clientbound,
    /// Client to server.
    Serverbound,
}

impl FlowDirection {
    pub fn name(self) -> &'static str {
        match self {
            FlowDirection::Clientbound => "clientbound",
            FlowDirection::Serverbound => "serverbound",
        }
    }
}

impl fmt::Display for FlowDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Body of an unknown payload consumed by the fallback provider.
///
/// Carries the observed identifier and the discarded body length so
/// callers can log or count what was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscardedPayload {
    pub id: ResourceId,
    pub len: usize,
}

/// Builder for an immutable payload type registry.
pub struct PayloadTypeRegistryBuilder {
    direction: FlowDirection,
    codecs: HashMap<ResourceId, ErasedCodec>,
    fallback_max: Option<usize>,
}

impl PayloadTypeRegistryBuilder {
    pub fn new(direction: FlowDirection) -> Self {
        Self {
            direction,
            codecs: HashMap::new(),
            fallback_max: None,
        }
    }

    pub fn direction(&self) -> FlowDirection {
        self.direction
    }

    /// Bind a codec to a type identifier.
    ///
    /// # Errors
    /// Returns `ProtocolError::DuplicatePayloadType` if the identifier is
    /// already bound in this direction.
    pub fn register<T: Send + Sync + 'static>(
        &mut self,
        id: ResourceId,
        codec: PayloadCodec<T>,
    ) -> Result<()> {
        if self.codecs.contains_key(&id) {
            return Err(ProtocolError::DuplicatePayloadType(id.to_string()));
        }
        self.codecs.insert(id, ErasedCodec::of(codec));
        Ok(())
    }

    /// Install a discard fallback for unknown identifiers, bounded by a
    /// maximum declared body size.
    pub fn with_fallback(&mut self, max_size: usize) -> &mut Self {
        self.fallback_max = Some(max_size);
        self
    }

    /// Freeze the builder into an immutable registry.
    pub fn build(self) -> PayloadTypeRegistry {
        debug!(
            direction = self.direction.name(),
            types = self.codecs.len(),
            fallback = self.fallback_max.is_some(),
            "Payload type registry built"
        );
        PayloadTypeRegistry {
            direction: self.direction,
            codecs: self.codecs,
            fallback_max: self.fallback_max,
        }
    }
}

/// Immutable map from type identifier to codec for one flow direction.
pub struct PayloadTypeRegistry {
    direction: FlowDirection,
    codecs: HashMap<ResourceId, ErasedCodec>,
    fallback_max: Option<usize>,
}

impl PayloadTypeRegistry {
    pub fn builder(direction: FlowDirection) -> PayloadTypeRegistryBuilder {
        PayloadTypeRegistryBuilder::new(direction)
    }

    pub fn direction(&self) -> FlowDirection {
        self.direction
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.codecs.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    /// Encode an envelope: type identifier first, body second.
    ///
    /// # Errors
    /// - `UnknownPayloadType` if the identifier has no bound codec
    /// - `PayloadEnvelope` wrapping any body encoding failure
    pub fn encode(&self, envelope: &Envelope) -> Result<Bytes> {
        let codec = self.codecs.get(&envelope.id).ok_or_else(|| {
            ProtocolError::UnknownPayloadType(envelope.id.to_string())
        })?;

        let mut buf = BytesMut::new();
        wire::put_resource_id(&mut buf, &envelope.id);
        codec
            .encode_into(envelope.body.as_ref(), &mut buf)
            .map_err(|e| e.in_envelope(constants::ERR_ENCODING, &envelope.id))?;

        global_metrics().payload_encoded(buf.len() as u64);
        trace!(id = %envelope.id, bytes = buf.len(), "Payload encoded");
        Ok(buf.freeze())
    }

    /// Decode an envelope from a complete frame payload.
    ///
    /// # Errors
    /// - `UnknownPayloadType` if no codec or fallback covers the identifier
    /// - `OversizedPayload` if only the fallback matches and the body
    ///   exceeds its size bound
    /// - `PayloadEnvelope` wrapping any body decoding failure, including
    ///   trailing bytes after the body
    pub fn decode(&self, frame: Bytes) -> Result<Envelope> {
        self.decode_with(frame, None)
    }

    /// Decode with an explicit per-call override map consulted before the
    /// registry's own table.
    pub fn decode_with(
        &self,
        frame: Bytes,
        overrides: Option<&HashMap<ResourceId, ErasedCodec>>,
    ) -> Result<Envelope> {
        let mut buf = frame;
        let id = wire::get_resource_id(&mut buf)?;

        let codec = overrides
            .and_then(|map| map.get(&id))
            .or_else(|| self.codecs.get(&id));

        if let Some(codec) = codec {
            let body = codec
                .decode_from(&mut buf)
                .map_err(|e| e.in_envelope(constants::ERR_DECODING, &id))?;
            if buf.has_remaining() {
                return Err(ProtocolError::DeserializeError(
                    constants::ERR_TRAILING_BYTES.to_string(),
                )
                .in_envelope(constants::ERR_DECODING, &id));
            }
            global_metrics().payload_decoded();
            trace!(id = %id, "Payload decoded");
            return Ok(Envelope { id, body });
        }

        match self.fallback_max {
            Some(max) => {
                let len = buf.remaining();
                if len > max {
                    return Err(ProtocolError::OversizedPayload { size: len, max }
                        .in_envelope(constants::ERR_DECODING, &id));
                }
                buf.advance(len);
                global_metrics().payload_discarded();
                debug!(id = %id, bytes = len, "Unknown payload discarded via fallback");
                Ok(Envelope::new(id.clone(), DiscardedPayload { id, len }))
            }
            None => Err(ProtocolError::UnknownPayloadType(id.to_string())),
        }
    }
}

impl fmt::Debug for PayloadTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadTypeRegistry")
            .field("direction", &self.direction)
            .field("types", &self.codecs.len())
            .field("fallback_max", &self.fallback_max)
            .finish()
    }
}
