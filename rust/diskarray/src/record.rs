//! The record capability: how an element type turns itself into bytes and back.
//!
//! A spilled record is stored as the raw bytes produced by [`Record::serialize_to`],
//! without inline framing: record boundaries are kept in the offset index. The bytes
//! handed to [`Record::deserialize_from`] are therefore exactly the bytes previously
//! written for that record, no more and no less.

use std::io::Write;

use diskarray_common::{Error, Result};

/// Footprint reported by records that do not provide their own estimate.
pub const DEFAULT_FOOTPRINT: usize = 64;

/// An element type that can be spilled to disk and reconstructed.
///
/// # Implementation Requirements
///
/// - `deserialize_from(bytes written by serialize_to(e))` must reproduce `e`
///   field-for-field, including zero-valued and empty fields.
/// - [`footprint()`](Record::footprint) should be cheap. It is called on every append
///   and during periodic rescans of the in-memory buffer. It does not need to be
///   exact, but it should scale with the data: doubling the payload should roughly
///   double the estimate.
pub trait Record: Sized {
    /// Writes the encoded bytes of this record to `sink`.
    fn serialize_to(&self, sink: &mut dyn Write) -> Result<()>;

    /// Reconstructs a record from exactly the bytes written for it by
    /// [`serialize_to()`](Record::serialize_to).
    fn deserialize_from(bytes: &[u8]) -> Result<Self>;

    /// Approximate in-memory size of this record, in bytes.
    fn footprint(&self) -> usize {
        DEFAULT_FOOTPRINT
    }
}

impl Record for Vec<u8> {
    fn serialize_to(&self, sink: &mut dyn Write) -> Result<()> {
        sink.write_all(self)
            .map_err(|e| Error::io("record serialization", e))
    }

    fn deserialize_from(bytes: &[u8]) -> Result<Self> {
        Ok(bytes.to_vec())
    }

    fn footprint(&self) -> usize {
        std::mem::size_of::<Self>() + self.capacity()
    }
}

impl Record for String {
    fn serialize_to(&self, sink: &mut dyn Write) -> Result<()> {
        sink.write_all(self.as_bytes())
            .map_err(|e| Error::io("record serialization", e))
    }

    fn deserialize_from(bytes: &[u8]) -> Result<Self> {
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::codec("utf-8 string record", e))
    }

    fn footprint(&self) -> usize {
        std::mem::size_of::<Self>() + self.capacity()
    }
}

/// A protobuf message stored as a record.
///
/// The footprint is the message's struct size plus its encoded length, which
/// tracks the amount of owned payload closely enough for budget accounting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtoRecord<M>(pub M);

impl<M> ProtoRecord<M> {
    pub fn into_inner(self) -> M {
        self.0
    }
}

impl<M> From<M> for ProtoRecord<M> {
    fn from(message: M) -> Self {
        ProtoRecord(message)
    }
}

impl<M> std::ops::Deref for ProtoRecord<M> {
    type Target = M;

    fn deref(&self) -> &M {
        &self.0
    }
}

impl<M> Record for ProtoRecord<M>
where
    M: prost::Message + Default,
{
    fn serialize_to(&self, sink: &mut dyn Write) -> Result<()> {
        let buf = self.0.encode_to_vec();
        sink.write_all(&buf)
            .map_err(|e| Error::io("protobuf record serialization", e))
    }

    fn deserialize_from(bytes: &[u8]) -> Result<Self> {
        M::decode(bytes)
            .map(ProtoRecord)
            .map_err(|e| Error::codec("protobuf record", e))
    }

    fn footprint(&self) -> usize {
        std::mem::size_of::<M>() + self.0.encoded_len()
    }
}

/// A `bincode`-encodable value stored as a record.
///
/// Uses the standard configuration with fixed-width integers. The footprint is
/// [`DEFAULT_FOOTPRINT`] or the value's struct size, whichever is larger.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BincodeRecord<T>(pub T);

impl<T> BincodeRecord<T> {
    pub fn into_inner(self) -> T {
        self.0
    }

    fn binc_config() -> impl bincode::config::Config {
        bincode::config::standard().with_fixed_int_encoding()
    }
}

impl<T> From<T> for BincodeRecord<T> {
    fn from(value: T) -> Self {
        BincodeRecord(value)
    }
}

impl<T> std::ops::Deref for BincodeRecord<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> Record for BincodeRecord<T>
where
    T: bincode::Encode + bincode::Decode<()>,
{
    fn serialize_to(&self, mut sink: &mut dyn Write) -> Result<()> {
        bincode::encode_into_std_write(&self.0, &mut sink, Self::binc_config())
            .map_err(|e| Error::codec("bincode record serialization", e.to_string()))?;
        Ok(())
    }

    fn deserialize_from(bytes: &[u8]) -> Result<Self> {
        let (value, consumed) = bincode::decode_from_slice::<T, _>(bytes, Self::binc_config())
            .map_err(|e| Error::codec("bincode record", e.to_string()))?;
        if consumed != bytes.len() {
            return Err(Error::codec(
                "bincode record",
                format!("{} trailing bytes after value", bytes.len() - consumed),
            ));
        }
        Ok(BincodeRecord(value))
    }

    fn footprint(&self) -> usize {
        std::mem::size_of::<T>().max(DEFAULT_FOOTPRINT)
    }
}
