//! `basalt-codec`: schema-described flat message encoding.
//!
//! A [`Schema`] names a fixed set of fields and assigns each a byte
//! offset in a flat buffer; a [`Message`] is one such buffer with typed
//! accessors. Encoding is a bounded copy — there is no framing, no
//! varints, no allocation on the wire path — which is exactly what a
//! fixed-slot ring wants: publishers encode into a scratch buffer and
//! publish it, subscribers decode the bytes `next` hands back.
//!
//! The codec is orthogonal to the ring layer; payloads are opaque bytes
//! to the rings either way.
//!
//! Scalar fields are host-endian, like everything else that crosses a
//! basalt region: the bytes never leave the host.

mod message;
mod schema;

pub use message::Message;
pub use schema::{Field, FieldType, MAX_FIELDS, Schema, SchemaBuilder};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("schema has no fields")]
    NoFields,

    #[error("schema exceeds {MAX_FIELDS} fields")]
    TooManyFields,

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("field '{field}' holds {have} bytes, value needs {need}")]
    ValueTooLarge {
        field: String,
        need: usize,
        have: usize,
    },

    #[error("buffer of {have} bytes too small for message of {need}")]
    BufferTooSmall { need: usize, have: usize },
}
