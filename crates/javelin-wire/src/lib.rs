//! Binary object-graph codec.
//!
//! Encodes a live object graph into a compact byte stream and decodes it
//! back against a shared type registry, preserving aliasing and cycles
//! through a per-stream object-id table. The scalar helpers in
//! [`scalar`] cover the remote-call boundary, where bare values skip the
//! graph codec.

pub mod bytes;
pub mod decode;
pub mod encode;
pub mod scalar;
pub mod tags;

pub use bytes::{ByteReader, ByteWriter};
pub use decode::BinaryDecoder;
pub use encode::{record_size, BinaryEncoder};
pub use tags::WireTag;
