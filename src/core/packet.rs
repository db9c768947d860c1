//! # Packet Format
//!
//! Binary outer frame carrying one payload envelope.
//!
//! ## Wire Format
//! ```text
//! [Magic(4)] [Version(1)] [Flags(1)] [Length(4, BE)] [Payload(N)]
//! ```
//!
//! Flags describe the payload encoding: bit 0 marks a compressed payload,
//! bit 1 selects Zstd over LZ4 when set. The declared length is validated
//! against [`MAX_PAYLOAD_SIZE`] before any allocation happens.

use crate::config::{TransportConfig, MAGIC_BYTES, MAX_PAYLOAD_SIZE, PROTOCOL_VERSION};
use crate::error::{ProtocolError, Result};
use crate::utils::compression::{maybe_compress, maybe_decompress, CompressionKind};

/// Payload is compressed.
pub const FLAG_COMPRESSED: u8 = 0b0000_0001;
/// Compressed payload uses Zstd; LZ4 otherwise.
pub const FLAG_ZSTD: u8 = 0b0000_0010;

/// Header size: magic + version + flags + length.
pub const HEADER_LEN: usize = 10;

/// One protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub version: u8,
    pub flags: u8,
    pub payload: Vec<u8>,
}

impl Packet {
    /// Build an uncompressed frame around a payload.
    pub fn plain(payload: Vec<u8>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            flags: 0,
            payload,
        }
    }

    /// Build a frame, compressing the payload per transport configuration.
    ///
    /// Payloads below the configured threshold are framed as-is.
    ///
    /// # Errors
    /// Returns `ProtocolError::CompressionFailure` if compression fails.
    pub fn from_payload(payload: Vec<u8>, transport: &TransportConfig) -> Result<Self> {
        if !transport.compression_enabled {
            return Ok(Self::plain(payload));
        }
        let kind = transport.compression_kind;
        let (out, compressed) =
            maybe_compress(&payload, &kind, transport.compression_threshold_bytes)?;
        let mut flags = 0;
        if compressed {
            flags |= FLAG_COMPRESSED;
            if matches!(kind, CompressionKind::Zstd) {
                flags |= FLAG_ZSTD;
            }
        }
        Ok(Self {
            version: PROTOCOL_VERSION,
            flags,
            payload: out,
        })
    }

    /// Recover the payload, decompressing if the flags say so.
    ///
    /// # Errors
    /// Returns `ProtocolError::DecompressionFailure` on corrupt or
    /// oversized compressed data.
    pub fn into_payload(self) -> Result<Vec<u8>> {
        let compressed = self.flags & FLAG_COMPRESSED != 0;
        let kind = if self.flags & FLAG_ZSTD != 0 {
            CompressionKind::Zstd
        } else {
            CompressionKind::Lz4
        };
        maybe_decompress(&self.payload, &kind, compressed)
    }

    /// Serialize the frame, header included.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.payload.len());
        out.extend_from_slice(&MAGIC_BYTES);
        out.push(self.version);
        out.push(self.flags);
        out.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Parse a frame from a complete byte slice.
    ///
    /// # Errors
    /// - `InvalidHeader` for short input, wrong magic, or trailing bytes
    /// - `UnsupportedVersion` for a version mismatch
    /// - `OversizedPacket` when the declared length exceeds [`MAX_PAYLOAD_SIZE`]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(ProtocolError::InvalidHeader);
        }
        if data[0..4] != MAGIC_BYTES {
            return Err(ProtocolError::InvalidHeader);
        }
        let version = data[4];
        let flags = data[5];
        let length = u32::from_be_bytes([data[6], data[7], data[8], data[9]]) as usize;

        if length > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::OversizedPacket(length));
        }
        if version != PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion(version));
        }
        if data.len() != HEADER_LEN + length {
            return Err(ProtocolError::InvalidHeader);
        }

        Ok(Self {
            version,
            flags,
            payload: data[HEADER_LEN..].to_vec(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let packet = Packet::plain(vec![1, 2, 3, 4]);
        let bytes = packet.to_bytes();
        let decoded = Packet::from_bytes(&bytes).expect("decode");
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_empty_payload() {
        let packet = Packet::plain(vec![]);
        let decoded = Packet::from_bytes(&packet.to_bytes()).expect("decode");
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut bytes = Packet::plain(vec![1]).to_bytes();
        bytes[0] ^= 0xFF;
        assert!(matches!(
            Packet::from_bytes(&bytes),
            Err(ProtocolError::InvalidHeader)
        ));
    }

    #[test]
    fn test_wrong_version_rejected() {
        let mut bytes = Packet::plain(vec![1]).to_bytes();
        bytes[4] = PROTOCOL_VERSION + 1;
        assert!(matches!(
            Packet::from_bytes(&bytes),
            Err(ProtocolError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_oversized_claim_rejected_before_read() {
        let mut bytes = MAGIC_BYTES.to_vec();
        bytes.push(PROTOCOL_VERSION);
        bytes.push(0);
        bytes.extend_from_slice(&(20_000_000u32).to_be_bytes());
        bytes.extend_from_slice(&[0xFF; 8]);
        assert!(matches!(
            Packet::from_bytes(&bytes),
            Err(ProtocolError::OversizedPacket(20_000_000))
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = Packet::plain(vec![9, 9]).to_bytes();
        bytes.push(0);
        assert!(Packet::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_compression_flag_roundtrip() {
        let transport = TransportConfig {
            compression_enabled: true,
            compression_threshold_bytes: 16,
            ..TransportConfig::default()
        };
        let payload = vec![0u8; 4096];
        let packet = Packet::from_payload(payload.clone(), &transport).expect("frame");
        assert_ne!(packet.flags & FLAG_COMPRESSED, 0);
        assert!(packet.payload.len() < payload.len());
        assert_eq!(packet.into_payload().expect("payload"), payload);
    }

    #[test]
    fn test_small_payload_skips_compression() {
        let transport = TransportConfig {
            compression_enabled: true,
            ..TransportConfig::default()
        };
        let packet = Packet::from_payload(vec![7; 8], &transport).expect("frame");
        assert_eq!(packet.flags, 0);
        assert_eq!(packet.into_payload().expect("payload"), vec![7; 8]);
    }
}
