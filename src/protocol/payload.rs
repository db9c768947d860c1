//! # Payload Codecs
//!
//! Bidirectional encode/decode pairs bound to one payload type, with
//! structural composition.
//!
//! A [`PayloadCodec<T>`] is a pair of closures sharing one buffer
//! discipline: encoders append to a `BytesMut`, decoders consume from the
//! front of a `Bytes`. Record codecs are built from an ordered list of
//! (sub-codec, field-accessor) pairs via the `composite*` constructors —
//! fields are written in declaration order and read back in the same
//! order.
//!
//! Top-level decoding through [`PayloadCodec::decode_value`] fails if the
//! buffer is not fully consumed: unknown trailing data is always an error.
//!
//! [`ErasedCodec`] type-erases a codec behind `dyn Any` so heterogeneous
//! payload types can share one registry; the downcast on encode is what
//! turns "wrong value for this type id" into a codec-mismatch error.

use crate::core::resource::ResourceId;
use crate::core::serialization::{MultiFormat, SerializationFormat};
use crate::core::wire;
use crate::error::{constants, ProtocolError, Result};
use bytes::{Buf, Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

type EncodeFn<T> = dyn Fn(&T, &mut BytesMut) -> Result<()> + Send + Sync;
type DecodeFn<T> = dyn Fn(&mut Bytes) -> Result<T> + Send + Sync;

/// A bidirectional serializer/deserializer for one value type.
pub struct PayloadCodec<T> {
    encode: Arc<EncodeFn<T>>,
    decode: Arc<DecodeFn<T>>,
}

impl<T> Clone for PayloadCodec<T> {
    fn clone(&self) -> Self {
        Self {
            encode: Arc::clone(&self.encode),
            decode: Arc::clone(&self.decode),
        }
    }
}

impl<T> fmt::Debug for PayloadCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PayloadCodec<{}>", std::any::type_name::<T>())
    }
}

impl<T: Send + Sync + 'static> PayloadCodec<T> {
    /// Build a codec from an encode/decode closure pair.
    pub fn new(
        encode: impl Fn(&T, &mut BytesMut) -> Result<()> + Send + Sync + 'static,
        decode: impl Fn(&mut Bytes) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            encode: Arc::new(encode),
            decode: Arc::new(decode),
        }
    }

    /// Encode a value into a fresh buffer.
    pub fn encode_value(&self, value: &T) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        (self.encode)(value, &mut buf)?;
        Ok(buf.freeze())
    }

    /// Append a value to an existing buffer (field encoding).
    pub fn encode_into(&self, value: &T, buf: &mut BytesMut) -> Result<()> {
        (self.encode)(value, buf)
    }

    /// Decode a complete body. Trailing bytes are an error.
    pub fn decode_value(&self, body: Bytes) -> Result<T> {
        let mut buf = body;
        let value = (self.decode)(&mut buf)?;
        if buf.has_remaining() {
            return Err(ProtocolError::DeserializeError(
                constants::ERR_TRAILING_BYTES.to_string(),
            ));
        }
        Ok(value)
    }

    /// Decode one value from the front of a buffer (field decoding).
    pub fn decode_from(&self, buf: &mut Bytes) -> Result<T> {
        (self.decode)(buf)
    }

    /// A codec for `Vec<T>`: u32 count followed by the elements in order.
    pub fn list(self) -> PayloadCodec<Vec<T>> {
        let dec = self.clone();
        PayloadCodec::new(
            move |values: &Vec<T>, buf| {
                buf.extend_from_slice(&(values.len() as u32).to_be_bytes());
                for value in values {
                    self.encode_into(value, buf)?;
                }
                Ok(())
            },
            move |buf| {
                let len = wire::get_u32(buf)? as usize;
                if len > buf.remaining() {
                    return Err(ProtocolError::DeserializeError(
                        constants::ERR_TRUNCATED_PAYLOAD.to_string(),
                    ));
                }
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    values.push(dec.decode_from(buf)?);
                }
                Ok(values)
            },
        )
    }

    /// A codec for `Option<T>`: presence byte followed by the value.
    pub fn optional(self) -> PayloadCodec<Option<T>> {
        let dec = self.clone();
        PayloadCodec::new(
            move |value: &Option<T>, buf| match value {
                Some(inner) => {
                    buf.extend_from_slice(&[1]);
                    self.encode_into(inner, buf)
                }
                None => {
                    buf.extend_from_slice(&[0]);
                    Ok(())
                }
            },
            move |buf| match wire::get_u8(buf)? {
                0 => Ok(None),
                1 => Ok(Some(dec.decode_from(buf)?)),
                other => Err(ProtocolError::DeserializeError(format!(
                    "Invalid presence byte: {other}"
                ))),
            },
        )
    }

    /// Transform a codec for `T` into a codec for `U`.
    pub fn map<U: Send + Sync + 'static>(
        self,
        from: impl Fn(T) -> U + Send + Sync + 'static,
        to: impl Fn(&U) -> T + Send + Sync + 'static,
    ) -> PayloadCodec<U> {
        let dec = self.clone();
        PayloadCodec::new(
            move |value: &U, buf| self.encode_into(&to(value), buf),
            move |buf| Ok(from(dec.decode_from(buf)?)),
        )
    }

    /// Serde-backed codec: one format tag byte plus a length-prefixed body.
    ///
    /// The tag makes element bodies self-describing, so a peer can decode
    /// values produced under a different configured format.
    pub fn serde(format: SerializationFormat) -> Self
    where
        T: Serialize + DeserializeOwned,
    {
        Self::new(
            move |value: &T, buf| {
                let body = value.serialize_format(format)?;
                buf.extend_from_slice(&[format.format_byte()]);
                wire::put_bytes(buf, &body);
                Ok(())
            },
            move |buf| {
                let tag = wire::get_u8(buf)?;
                let observed = SerializationFormat::from_byte(tag).ok_or_else(|| {
                    ProtocolError::DeserializeError(format!("Unknown format byte: {tag}"))
                })?;
                let body = wire::get_bytes(buf)?;
                T::deserialize_format(&body, observed)
            },
        )
    }

    /// Record codec with one field.
    pub fn composite1<A>(
        ca: PayloadCodec<A>,
        ga: impl Fn(&T) -> &A + Send + Sync + 'static,
        ctor: impl Fn(A) -> T + Send + Sync + 'static,
    ) -> Self
    where
        A: Send + Sync + 'static,
    {
        let da = ca.clone();
        Self::new(
            move |value, buf| ca.encode_into(ga(value), buf),
            move |buf| Ok(ctor(da.decode_from(buf)?)),
        )
    }

    /// Record codec with two fields, encoded in declaration order.
    pub fn composite2<A, B>(
        ca: PayloadCodec<A>,
        ga: impl Fn(&T) -> &A + Send + Sync + 'static,
        cb: PayloadCodec<B>,
        gb: impl Fn(&T) -> &B + Send + Sync + 'static,
        ctor: impl Fn(A, B) -> T + Send + Sync + 'static,
    ) -> Self
    where
        A: Send + Sync + 'static,
        B: Send + Sync + 'static,
    {
        let (da, db) = (ca.clone(), cb.clone());
        Self::new(
            move |value, buf| {
                ca.encode_into(ga(value), buf)?;
                cb.encode_into(gb(value), buf)
            },
            move |buf| {
                let a = da.decode_from(buf)?;
                let b = db.decode_from(buf)?;
                Ok(ctor(a, b))
            },
        )
    }

    /// Record codec with three fields, encoded in declaration order.
    pub fn composite3<A, B, C>(
        ca: PayloadCodec<A>,
        ga: impl Fn(&T) -> &A + Send + Sync + 'static,
        cb: PayloadCodec<B>,
        gb: impl Fn(&T) -> &B + Send + Sync + 'static,
        cc: PayloadCodec<C>,
        gc: impl Fn(&T) -> &C + Send + Sync + 'static,
        ctor: impl Fn(A, B, C) -> T + Send + Sync + 'static,
    ) -> Self
    where
        A: Send + Sync + 'static,
        B: Send + Sync + 'static,
        C: Send + Sync + 'static,
    {
        let (da, db, dc) = (ca.clone(), cb.clone(), cc.clone());
        Self::new(
            move |value, buf| {
                ca.encode_into(ga(value), buf)?;
                cb.encode_into(gb(value), buf)?;
                cc.encode_into(gc(value), buf)
            },
            move |buf| {
                let a = da.decode_from(buf)?;
                let b = db.decode_from(buf)?;
                let c = dc.decode_from(buf)?;
                Ok(ctor(a, b, c))
            },
        )
    }

    /// Record codec with four fields, encoded in declaration order.
    #[allow(clippy::too_many_arguments)]
    pub fn composite4<A, B, C, D>(
        ca: PayloadCodec<A>,
        ga: impl Fn(&T) -> &A + Send + Sync + 'static,
        cb: PayloadCodec<B>,
        gb: impl Fn(&T) -> &B + Send + Sync + 'static,
        cc: PayloadCodec<C>,
        gc: impl Fn(&T) -> &C + Send + Sync + 'static,
        cd: PayloadCodec<D>,
        gd: impl Fn(&T) -> &D + Send + Sync + 'static,
        ctor: impl Fn(A, B, C, D) -> T + Send + Sync + 'static,
    ) -> Self
    where
        A: Send + Sync + 'static,
        B: Send + Sync + 'static,
        C: Send + Sync + 'static,
        D: Send + Sync + 'static,
    {
        let (da, db, dc, dd) = (ca.clone(), cb.clone(), cc.clone(), cd.clone());
        Self::new(
            move |value, buf| {
                ca.encode_into(ga(value), buf)?;
                cb.encode_into(gb(value), buf)?;
                cc.encode_into(gc(value), buf)?;
                cd.encode_into(gd(value), buf)
            },
            move |buf| {
                let a = da.decode_from(buf)?;
                let b = db.decode_from(buf)?;
                let c = dc.decode_from(buf)?;
                let d = dd.decode_from(buf)?;
                Ok(ctor(a, b, c, d))
            },
        )
    }
}

/// Primitive codecs shared by the record constructors.
pub mod codecs {
    use super::*;

    /// Single byte.
    pub fn u8() -> PayloadCodec<u8> {
        PayloadCodec::new(
            |value, buf| {
                buf.extend_from_slice(&[*value]);
                Ok(())
            },
            wire::get_u8,
        )
    }

    /// Big-endian u32.
    pub fn u32() -> PayloadCodec<u32> {
        PayloadCodec::new(
            |value, buf| {
                buf.extend_from_slice(&value.to_be_bytes());
                Ok(())
            },
            wire::get_u32,
        )
    }

    /// Big-endian u64.
    pub fn u64() -> PayloadCodec<u64> {
        PayloadCodec::new(
            |value, buf| {
                buf.extend_from_slice(&value.to_be_bytes());
                Ok(())
            },
            wire::get_u64,
        )
    }

    /// Length-prefixed UTF-8 string.
    pub fn string() -> PayloadCodec<String> {
        PayloadCodec::new(
            |value: &String, buf| {
                wire::put_str(buf, value);
                Ok(())
            },
            wire::get_str,
        )
    }

    /// Length-prefixed opaque byte blob.
    pub fn byte_blob() -> PayloadCodec<Bytes> {
        PayloadCodec::new(
            |value: &Bytes, buf| {
                wire::put_bytes(buf, value);
                Ok(())
            },
            wire::get_bytes,
        )
    }

    /// Namespaced resource id.
    pub fn resource_id() -> PayloadCodec<ResourceId> {
        PayloadCodec::new(
            |value: &ResourceId, buf| {
                wire::put_resource_id(buf, value);
                Ok(())
            },
            wire::get_resource_id,
        )
    }
}

/// A decoded payload body, type-erased.
pub type BoxedPayload = Box<dyn Any + Send + Sync>;

/// A codec operating on type-erased values, for heterogeneous registries.
#[derive(Clone)]
pub struct ErasedCodec {
    encode: Arc<dyn Fn(&(dyn Any + Send + Sync), &mut BytesMut) -> Result<()> + Send + Sync>,
    decode: Arc<dyn Fn(&mut Bytes) -> Result<BoxedPayload> + Send + Sync>,
}

impl ErasedCodec {
    /// Erase a typed codec. Encoding a value of any other type fails with
    /// a serialize error rather than a panic.
    pub fn of<T: Send + Sync + 'static>(codec: PayloadCodec<T>) -> Self {
        let enc = codec.clone();
        Self {
            encode: Arc::new(move |value, buf| {
                let value = value.downcast_ref::<T>().ok_or_else(|| {
                    ProtocolError::SerializeError(
                        constants::ERR_PAYLOAD_TYPE_MISMATCH.to_string(),
                    )
                })?;
                enc.encode_into(value, buf)
            }),
            decode: Arc::new(move |buf| {
                let value = codec.decode_from(buf)?;
                Ok(Box::new(value) as BoxedPayload)
            }),
        }
    }

    /// Append a type-erased value to a buffer.
    pub fn encode_into(&self, value: &(dyn Any + Send + Sync), buf: &mut BytesMut) -> Result<()> {
        (self.encode)(value, buf)
    }

    /// Encode a type-erased value into a fresh buffer.
    pub fn encode_value(&self, value: &(dyn Any + Send + Sync)) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        (self.encode)(value, &mut buf)?;
        Ok(buf.freeze())
    }

    /// Decode one value from the front of a buffer.
    pub fn decode_from(&self, buf: &mut Bytes) -> Result<BoxedPayload> {
        (self.decode)(buf)
    }
}

impl fmt::Debug for ErasedCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ErasedCodec")
    }
}

/// A typed payload tagged with its wire identifier, pre-encoding.
pub struct Envelope {
    pub id: ResourceId,
    pub body: BoxedPayload,
}

impl Envelope {
    pub fn new<T: Send + Sync + 'static>(id: ResourceId, body: T) -> Self {
        Self {
            id,
            body: Box::new(body),
        }
    }

    /// Borrow the body as a concrete type.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.body.downcast_ref::<T>()
    }

    /// Take the body as a concrete type, returning the envelope unchanged
    /// on a type mismatch.
    pub fn downcast<T: 'static>(self) -> std::result::Result<T, Envelope> {
        match self.body.downcast::<T>() {
            Ok(body) => Ok(*body),
            Err(body) => Err(Envelope { id: self.id, body }),
        }
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Envelope({})", self.id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Sample {
        name: String,
        count: u32,
        note: Option<String>,
    }

    fn sample_codec() -> PayloadCodec<Sample> {
        PayloadCodec::composite3(
            codecs::string(),
            |s: &Sample| &s.name,
            codecs::u32(),
            |s: &Sample| &s.count,
            codecs::string().optional(),
            |s: &Sample| &s.note,
            |name, count, note| Sample { name, count, note },
        )
    }

    #[test]
    fn test_composite_roundtrip() {
        let codec = sample_codec();
        let value = Sample {
            name: "widget".into(),
            count: 7,
            note: Some("spare".into()),
        };
        let body = codec.encode_value(&value).unwrap();
        assert_eq!(codec.decode_value(body).unwrap(), value);
    }

    #[test]
    fn test_fields_encode_in_declaration_order() {
        let codec = sample_codec();
        let value = Sample {
            name: "ab".into(),
            count: 1,
            note: None,
        };
        let body = codec.encode_value(&value).unwrap();
        // [len=2]["ab"][count][presence=0]
        assert_eq!(&body[..], &[0, 0, 0, 2, b'a', b'b', 0, 0, 0, 1, 0]);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let codec = codecs::u32();
        let mut body = BytesMut::new();
        body.extend_from_slice(&7u32.to_be_bytes());
        body.extend_from_slice(&[0xFF]);
        assert!(matches!(
            codec.decode_value(body.freeze()),
            Err(ProtocolError::DeserializeError(_))
        ));
    }

    #[test]
    fn test_truncated_field_rejected() {
        let codec = sample_codec();
        let value = Sample {
            name: "widget".into(),
            count: 7,
            note: None,
        };
        let body = codec.encode_value(&value).unwrap();
        let truncated = body.slice(..body.len() - 3);
        assert!(codec.decode_value(truncated).is_err());
    }

    #[test]
    fn test_list_roundtrip_preserves_order() {
        let codec = codecs::string().list();
        let values = vec!["c".to_string(), "a".to_string(), "b".to_string()];
        let body = codec.encode_value(&values).unwrap();
        assert_eq!(codec.decode_value(body).unwrap(), values);
    }

    #[test]
    fn test_list_forged_count_rejected() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&u32::MAX.to_be_bytes());
        let codec = codecs::u8().list();
        assert!(codec.decode_value(buf.freeze()).is_err());
    }

    #[test]
    fn test_serde_codec_roundtrip() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Element {
            weight: u32,
            label: String,
        }
        let codec: PayloadCodec<Element> = PayloadCodec::serde(SerializationFormat::Bincode);
        let value = Element {
            weight: 10,
            label: "heavy".into(),
        };
        let body = codec.encode_value(&value).unwrap();
        assert_eq!(codec.decode_value(body).unwrap(), value);
    }

    #[test]
    fn test_erased_codec_rejects_wrong_type() {
        let erased = ErasedCodec::of(codecs::u32());
        let wrong: BoxedPayload = Box::new("not a u32".to_string());
        let mut buf = BytesMut::new();
        assert!(matches!(
            erased.encode_into(wrong.as_ref(), &mut buf),
            Err(ProtocolError::SerializeError(_))
        ));
    }

    #[test]
    fn test_erased_codec_roundtrip() {
        let erased = ErasedCodec::of(codecs::string());
        let value: BoxedPayload = Box::new("payload".to_string());
        let body = erased.encode_value(value.as_ref()).unwrap();
        let mut buf = body;
        let decoded = erased.decode_from(&mut buf).unwrap();
        assert_eq!(decoded.downcast_ref::<String>().unwrap(), "payload");
    }

    #[test]
    fn test_envelope_downcast() {
        let envelope = Envelope::new(ResourceId::from_static("registry", "n"), 42u32);
        assert_eq!(envelope.downcast_ref::<u32>(), Some(&42));
        assert!(envelope.downcast_ref::<String>().is_none());
        let value = envelope.downcast::<u32>().unwrap();
        assert_eq!(value, 42);
    }
}
