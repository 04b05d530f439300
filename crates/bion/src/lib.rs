//! BION: a self-describing binary tree value.
//!
//! A [`Node`] holds nothing, one scalar, a typed homogeneous array, a
//! list, or named children. [`OrderedMap`] layers sorted key/value
//! semantics onto a node, and [`wire`] serializes any node tree without
//! an external schema.

pub mod error;
pub mod map;
pub mod node;
pub mod scalar;
pub mod sort;
pub mod varint;
pub mod wire;

pub use error::{Error, Result};
pub use map::{MapValue, OrderedMap};
pub use node::{ArrayData, Kind, Node};
pub use scalar::{Scalar, ScalarKind, ScalarValue};
pub use wire::Document;
