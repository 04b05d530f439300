//! The BION wire format: tag bytes, writer, streaming reader, and
//! document framing.

pub mod document;
pub mod marker;
pub mod reader;
pub mod writer;

pub use document::{Document, FORMAT_VERSION};
pub use marker::Marker;
pub use reader::{from_bytes, read_node, Token, TreeBuilder};
pub use writer::{to_bytes, write_node, ByteSink};
