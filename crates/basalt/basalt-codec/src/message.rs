//! Messages: flat buffers with typed, schema-checked accessors.

use crate::schema::{Field, FieldType, Schema};
use crate::CodecError;
use std::mem::size_of;

/// One message laid out per its schema. The buffer is always exactly
/// `schema.total_size()` bytes; unset fields read as zero.
pub struct Message<'s> {
    schema: &'s Schema,
    data: Vec<u8>,
}

macro_rules! scalar_accessors {
    ($set:ident, $get:ident, $ty:ty, $variant:ident) => {
        pub fn $set(&mut self, field: &str, value: $ty) -> Result<(), CodecError> {
            let f = self.checked_field(field, FieldType::$variant)?;
            let offset = f.offset as usize;
            self.data[offset..offset + size_of::<$ty>()]
                .copy_from_slice(&value.to_ne_bytes());
            Ok(())
        }

        pub fn $get(&self, field: &str) -> Result<$ty, CodecError> {
            let f = self.checked_field(field, FieldType::$variant)?;
            let offset = f.offset as usize;
            let mut raw = [0u8; size_of::<$ty>()];
            raw.copy_from_slice(&self.data[offset..offset + size_of::<$ty>()]);
            Ok(<$ty>::from_ne_bytes(raw))
        }
    };
}

impl<'s> Message<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            data: vec![0; schema.total_size()],
        }
    }

    pub fn schema(&self) -> &Schema {
        self.schema
    }

    /// The encoded bytes; suitable to publish directly.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    scalar_accessors!(set_u64, get_u64, u64, U64);
    scalar_accessors!(set_i64, get_i64, i64, I64);
    scalar_accessors!(set_f64, get_f64, f64, F64);
    scalar_accessors!(set_u32, get_u32, u32, U32);
    scalar_accessors!(set_i32, get_i32, i32, I32);
    scalar_accessors!(set_f32, get_f32, f32, F32);

    /// Copies `value` into a Bytes or Str field; shorter values leave
    /// the remainder of the field zeroed.
    pub fn set_bytes(&mut self, field: &str, value: &[u8]) -> Result<(), CodecError> {
        let f = self.sized_field(field)?;
        let (offset, size) = (f.offset as usize, f.size as usize);
        if value.len() > size {
            return Err(CodecError::ValueTooLarge {
                field: field.to_string(),
                need: value.len(),
                have: size,
            });
        }
        self.data[offset..offset + value.len()].copy_from_slice(value);
        self.data[offset + value.len()..offset + size].fill(0);
        Ok(())
    }

    /// The full field width of a Bytes or Str field.
    pub fn get_bytes(&self, field: &str) -> Result<&[u8], CodecError> {
        let f = self.sized_field(field)?;
        let (offset, size) = (f.offset as usize, f.size as usize);
        Ok(&self.data[offset..offset + size])
    }

    /// A Str field up to its NUL padding.
    pub fn get_str(&self, field: &str) -> Result<&str, CodecError> {
        let raw = self.get_bytes(field)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        Ok(std::str::from_utf8(&raw[..end]).unwrap_or(""))
    }

    /// Copies the message into `out`, returning the encoded length.
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        if out.len() < self.data.len() {
            return Err(CodecError::BufferTooSmall {
                need: self.data.len(),
                have: out.len(),
            });
        }
        out[..self.data.len()].copy_from_slice(&self.data);
        Ok(self.data.len())
    }

    /// Rebuilds a message from encoded bytes (e.g. a received payload).
    pub fn decode(schema: &'s Schema, bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() < schema.total_size() {
            return Err(CodecError::BufferTooSmall {
                need: schema.total_size(),
                have: bytes.len(),
            });
        }
        Ok(Self {
            schema,
            data: bytes[..schema.total_size()].to_vec(),
        })
    }

    fn checked_field(&self, name: &str, ty: FieldType) -> Result<&'s Field, CodecError> {
        let schema: &'s Schema = self.schema;
        let f = schema
            .field(name)
            .ok_or_else(|| CodecError::UnknownField(name.to_string()))?;
        if f.ty != ty {
            // A scalar accessor on the wrong type would silently read
            // a neighbour's bytes; refuse instead.
            return Err(CodecError::UnknownField(name.to_string()));
        }
        Ok(f)
    }

    fn sized_field(&self, name: &str) -> Result<&'s Field, CodecError> {
        let schema: &'s Schema = self.schema;
        let f = schema
            .field(name)
            .ok_or_else(|| CodecError::UnknownField(name.to_string()))?;
        match f.ty {
            FieldType::Bytes | FieldType::Str => Ok(f),
            _ => Err(CodecError::UnknownField(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick_schema() -> Schema {
        Schema::builder(3, "tick")
            .field("ts_ns", FieldType::U64)
            .field("price", FieldType::F64)
            .field("qty", FieldType::I32)
            .str_field("symbol", 8)
            .finish()
            .unwrap()
    }

    #[test]
    fn set_get_round_trip() {
        let schema = tick_schema();
        let mut msg = Message::new(&schema);

        msg.set_u64("ts_ns", 123_456_789).unwrap();
        msg.set_f64("price", 101.25).unwrap();
        msg.set_i32("qty", -40).unwrap();
        msg.set_bytes("symbol", b"BTCUSD").unwrap();

        assert_eq!(msg.get_u64("ts_ns").unwrap(), 123_456_789);
        assert_eq!(msg.get_f64("price").unwrap(), 101.25);
        assert_eq!(msg.get_i32("qty").unwrap(), -40);
        assert_eq!(msg.get_str("symbol").unwrap(), "BTCUSD");
    }

    #[test]
    fn encode_decode_round_trip() {
        let schema = tick_schema();
        let mut msg = Message::new(&schema);
        msg.set_u64("ts_ns", 42).unwrap();
        msg.set_bytes("symbol", b"ETHUSD").unwrap();

        let mut wire = vec![0u8; schema.total_size()];
        let n = msg.encode(&mut wire).unwrap();
        assert_eq!(n, schema.total_size());

        let decoded = Message::decode(&schema, &wire).unwrap();
        assert_eq!(decoded.get_u64("ts_ns").unwrap(), 42);
        assert_eq!(decoded.get_str("symbol").unwrap(), "ETHUSD");
    }

    #[test]
    fn misuse_is_rejected() {
        let schema = tick_schema();
        let mut msg = Message::new(&schema);

        assert!(matches!(
            msg.set_u64("nope", 1),
            Err(CodecError::UnknownField(_))
        ));
        // Wrong-typed access must not read a neighbour's bytes.
        assert!(msg.get_u64("price").is_err());
        assert!(matches!(
            msg.set_bytes("symbol", b"TOOLONGSYM"),
            Err(CodecError::ValueTooLarge { .. })
        ));

        let mut small = [0u8; 4];
        assert!(matches!(
            msg.encode(&mut small),
            Err(CodecError::BufferTooSmall { .. })
        ));
        assert!(Message::decode(&schema, &small).is_err());
    }

    #[test]
    fn short_bytes_zero_the_tail() {
        let schema = tick_schema();
        let mut msg = Message::new(&schema);
        msg.set_bytes("symbol", b"LONGSYM").unwrap();
        msg.set_bytes("symbol", b"AB").unwrap();
        assert_eq!(msg.get_str("symbol").unwrap(), "AB");
        assert_eq!(&msg.get_bytes("symbol").unwrap()[2..], &[0u8; 6]);
    }
}
