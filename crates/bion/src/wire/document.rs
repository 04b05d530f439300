//! Document framing around one encoded tree.
//!
//! A document is the unit handed to storage or transport: a fixed magic,
//! a format version byte, the varint payload length, then the encoded
//! root value. The framing is opaque to the node layer; it exists so a
//! reader can reject foreign bytes and cut payloads before spending any
//! time tokenizing them.

use crate::error::{Error, Result};
use crate::node::Node;
use crate::varint;
use crate::wire::{reader, writer};

const MAGIC: &[u8; 4] = b"BION";

/// Wire format version this build reads and writes.
pub const FORMAT_VERSION: u8 = 1;

/// One framed root value.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Node,
}

impl Document {
    #[must_use]
    pub fn new(root: Node) -> Self {
        Document { root }
    }

    #[must_use]
    pub fn root(&self) -> &Node {
        &self.root
    }

    #[must_use]
    pub fn into_root(self) -> Node {
        self.root
    }

    /// Frame and encode: magic, version, varint payload length, payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let payload = writer::to_bytes(&self.root)?;
        assert!(
            payload.len() <= varint::MAX_VALUE as usize,
            "document payload too large"
        );
        let mut out = Vec::with_capacity(payload.len() + 4 + 1 + varint::MAX_LEN);
        out.extend_from_slice(MAGIC);
        out.push(FORMAT_VERSION);
        varint::write_u32(payload.len() as u32, &mut out);
        out.extend_from_slice(&payload);
        Ok(out)
    }

    /// Validate the framing and decode the payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match bytes.get(..MAGIC.len()) {
            Some(magic) if magic == MAGIC => {}
            _ => return Err(Error::InvalidMagic),
        }
        let version = *bytes.get(MAGIC.len()).ok_or(Error::TruncatedValue)?;
        if version != FORMAT_VERSION {
            return Err(Error::UndefinedValueType { tag: version });
        }
        let rest = &bytes[MAGIC.len() + 1..];
        let (length, consumed) = varint::read_u32(rest)?;
        let payload = &rest[consumed..];
        if payload.len() < length as usize {
            return Err(Error::TruncatedValue);
        }
        if payload.len() > length as usize {
            return Err(Error::UndefinedContainerType("trailing data after payload"));
        }
        Ok(Document {
            root: reader::from_bytes(payload)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_a_null_root() {
        let doc = Document::new(Node::Null);
        let bytes = doc.to_bytes().unwrap();
        assert_eq!(bytes, [b'B', b'I', b'O', b'N', 0x01, 0x01, 0x00]);
        assert_eq!(Document::from_bytes(&bytes).unwrap(), doc);
    }

    #[test]
    fn round_trips_a_tree() {
        let mut root = Node::parent();
        root.add_named("xs", [1u64, 2].into_iter().collect::<Node>())
            .unwrap();
        let doc = Document::new(root);
        let bytes = doc.to_bytes().unwrap();
        let back = Document::from_bytes(&bytes).unwrap();
        assert_eq!(back.root(), doc.root());
    }

    #[test]
    fn rejects_foreign_magic() {
        assert_eq!(
            Document::from_bytes(b"NOPE\x01\x01\x00"),
            Err(Error::InvalidMagic)
        );
        assert_eq!(Document::from_bytes(b"BI"), Err(Error::InvalidMagic));
    }

    #[test]
    fn rejects_unknown_version() {
        assert_eq!(
            Document::from_bytes(&[b'B', b'I', b'O', b'N', 0x02, 0x01, 0x00]),
            Err(Error::UndefinedValueType { tag: 0x02 })
        );
    }

    #[test]
    fn rejects_short_and_long_payloads() {
        // declares 2 payload bytes, carries 1
        assert_eq!(
            Document::from_bytes(&[b'B', b'I', b'O', b'N', 0x01, 0x02, 0x00]),
            Err(Error::TruncatedValue)
        );
        // declares 1 payload byte, carries 2
        assert_eq!(
            Document::from_bytes(&[b'B', b'I', b'O', b'N', 0x01, 0x01, 0x00, 0x00]),
            Err(Error::UndefinedContainerType("trailing data after payload"))
        );
    }
}
