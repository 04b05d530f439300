//! Depth-first tree writer.
//!
//! Walks a [`Node`] and emits the wire encoding into a caller-owned sink.
//! Scalars go out as tagged values. Homogeneous arrays go out as one type
//! descriptor followed by untagged elements, which is the format's whole
//! reason to distinguish `Array(T)` from a list of boxed scalars: N
//! elements cost one tag instead of N.

use crate::error::{Error, Result};
use crate::node::{ArrayData, Node};
use crate::scalar::Scalar;
use crate::varint;
use crate::wire::marker::Marker;

/// Byte sink the writer emits into. The sink stays owned by the caller;
/// the writer only borrows it for the duration of a walk.
pub trait ByteSink {
    fn put(&mut self, bytes: &[u8]);

    fn put_byte(&mut self, byte: u8) {
        self.put(&[byte]);
    }
}

impl ByteSink for Vec<u8> {
    fn put(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

/// Encode a whole tree into a fresh buffer.
pub fn to_bytes(node: &Node) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_node(node, &mut out)?;
    tracing::trace!(bytes = out.len(), "encoded node tree");
    Ok(out)
}

/// Write the wire encoding of `node` and its subtree into `sink`.
pub fn write_node<S: ByteSink>(node: &Node, sink: &mut S) -> Result<()> {
    match node {
        Node::Null => {
            sink.put_byte(Marker::Null.byte());
            Ok(())
        }
        Node::Scalar(scalar) => write_scalar(scalar, sink),
        Node::Array(data) => write_array(data, sink),
        Node::List(children) => {
            sink.put_byte(Marker::ListBegin.byte());
            for child in children {
                write_node(child, sink)?;
            }
            sink.put_byte(Marker::ListEnd.byte());
            Ok(())
        }
        Node::Parent(children) => {
            sink.put_byte(Marker::ObjectBegin.byte());
            for (name, child) in children {
                sink.put_byte(Marker::Name.byte());
                put_cstr(name, sink)?;
                write_node(child, sink)?;
            }
            sink.put_byte(Marker::ObjectEnd.byte());
            Ok(())
        }
    }
}

/// Tagged scalar: marker byte then the payload.
fn write_scalar<S: ByteSink>(scalar: &Scalar, sink: &mut S) -> Result<()> {
    sink.put_byte(Marker::of_scalar_kind(scalar.kind()).byte());
    put_payload(scalar, sink)
}

/// Typed array: begin marker, element descriptor {marker, byte width,
/// varint count}, untagged payloads, end marker.
fn write_array<S: ByteSink>(data: &ArrayData, sink: &mut S) -> Result<()> {
    let kind = data.kind();
    sink.put_byte(Marker::ArrayBegin.byte());
    sink.put_byte(Marker::of_scalar_kind(kind).byte());
    sink.put_byte(kind.wire_width());
    assert!(
        data.len() <= varint::MAX_VALUE as usize,
        "array too long for the wire"
    );
    let mut count = Vec::with_capacity(varint::MAX_LEN);
    varint::write_u32(data.len() as u32, &mut count);
    sink.put(&count);
    for index in 0..data.len() {
        match data.scalar_at(index) {
            Some(element) => put_payload(&element, sink)?,
            None => unreachable!("index is within the array"),
        }
    }
    sink.put_byte(Marker::ArrayEnd.byte());
    Ok(())
}

/// Untagged payload bytes of one scalar, little-endian for numerics.
fn put_payload<S: ByteSink>(scalar: &Scalar, sink: &mut S) -> Result<()> {
    match scalar {
        Scalar::Bool(v) => sink.put_byte(u8::from(*v)),
        Scalar::I32(v) => sink.put(&v.to_le_bytes()),
        Scalar::U32(v) => sink.put(&v.to_le_bytes()),
        Scalar::I64(v) => sink.put(&v.to_le_bytes()),
        Scalar::U64(v) => sink.put(&v.to_le_bytes()),
        Scalar::F32(v) => sink.put(&v.to_le_bytes()),
        Scalar::F64(v) => sink.put(&v.to_le_bytes()),
        Scalar::Str(v) => put_cstr(v, sink)?,
    }
    Ok(())
}

/// Zero-terminated string. Interior NUL would corrupt the frame, so it
/// is rejected instead of written.
fn put_cstr<S: ByteSink>(text: &str, sink: &mut S) -> Result<()> {
    if text.as_bytes().contains(&0) {
        return Err(Error::WrongScalarType("string contains NUL"));
    }
    sink.put(text.as_bytes());
    sink.put_byte(0);
    Ok(())
}
