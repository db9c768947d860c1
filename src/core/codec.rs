//! # Stream Framing Codec
//!
//! Tokio codec splitting a byte stream into [`Packet`] frames.
//!
//! The decoder validates the header (magic, version, declared length)
//! before reserving buffer space, so a malicious peer cannot force a large
//! allocation with a forged length field.

use crate::config::{MAGIC_BYTES, MAX_PAYLOAD_SIZE, PROTOCOL_VERSION};
use crate::core::packet::{Packet, HEADER_LEN};
use crate::error::ProtocolError;
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Length-prefixed packet codec for use with `tokio_util::codec::Framed`.
pub struct PacketCodec;

impl Encoder<Packet> for PacketCodec {
    type Error = ProtocolError;

    fn encode(&mut self, packet: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if packet.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::OversizedPacket(packet.payload.len()));
        }
        dst.reserve(HEADER_LEN + packet.payload.len());
        dst.put_slice(&MAGIC_BYTES);
        dst.put_u8(packet.version);
        dst.put_u8(packet.flags);
        dst.put_u32(packet.payload.len() as u32);
        dst.put_slice(&packet.payload);
        Ok(())
    }
}

impl Decoder for PacketCodec {
    type Item = Packet;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Packet>, Self::Error> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        if src[0..4] != MAGIC_BYTES {
            return Err(ProtocolError::InvalidHeader);
        }
        let version = src[4];
        let flags = src[5];
        let length = u32::from_be_bytes([src[6], src[7], src[8], src[9]]) as usize;

        if length > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::OversizedPacket(length));
        }
        if version != PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion(version));
        }

        if src.len() < HEADER_LEN + length {
            // Wait for the rest of the frame.
            src.reserve(HEADER_LEN + length - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        let payload = src.split_to(length).to_vec();
        Ok(Some(Packet {
            version,
            flags,
            payload,
        }))
    }
}
