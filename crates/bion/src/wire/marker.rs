//! Wire tag bytes.
//!
//! Every value on the wire starts with a 1-byte marker. Scalar markers are
//! followed by a fixed-width payload (strings are zero-terminated);
//! container markers frame their contents with a matching end marker. The
//! extended-float marker is reserved: it is never written, and decoding it
//! fails.

use crate::error::{Error, Result};
use crate::scalar::ScalarKind;

/// Tag byte preceding each wire element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Marker {
    Null = 0x00,
    Bool = 0x01,
    I32 = 0x02,
    U32 = 0x03,
    I64 = 0x04,
    U64 = 0x05,
    F32 = 0x06,
    F64 = 0x07,
    /// Reserved for 80-bit floats; never emitted.
    F80 = 0x08,
    Str = 0x09,
    /// Typed array: element marker, element width, varint count, then
    /// untagged elements up to [`Marker::ArrayEnd`].
    ArrayBegin = 0x10,
    ArrayEnd = 0x11,
    ListBegin = 0x12,
    ListEnd = 0x13,
    ObjectBegin = 0x14,
    ObjectEnd = 0x15,
    /// Zero-terminated member name; applies to the next value.
    Name = 0x16,
}

impl Marker {
    /// Parse a marker from a raw tag byte.
    pub fn from_byte(byte: u8) -> Result<Self> {
        Ok(match byte {
            0x00 => Marker::Null,
            0x01 => Marker::Bool,
            0x02 => Marker::I32,
            0x03 => Marker::U32,
            0x04 => Marker::I64,
            0x05 => Marker::U64,
            0x06 => Marker::F32,
            0x07 => Marker::F64,
            0x08 => Marker::F80,
            0x09 => Marker::Str,
            0x10 => Marker::ArrayBegin,
            0x11 => Marker::ArrayEnd,
            0x12 => Marker::ListBegin,
            0x13 => Marker::ListEnd,
            0x14 => Marker::ObjectBegin,
            0x15 => Marker::ObjectEnd,
            0x16 => Marker::Name,
            tag => return Err(Error::UndefinedValueType { tag }),
        })
    }

    /// Get the raw tag byte.
    #[inline]
    #[must_use]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Scalar kind a value marker stands for; `None` for container
    /// markers and the reserved extended float.
    #[must_use]
    pub fn scalar_kind(self) -> Option<ScalarKind> {
        match self {
            Marker::Bool => Some(ScalarKind::Bool),
            Marker::I32 => Some(ScalarKind::I32),
            Marker::U32 => Some(ScalarKind::U32),
            Marker::I64 => Some(ScalarKind::I64),
            Marker::U64 => Some(ScalarKind::U64),
            Marker::F32 => Some(ScalarKind::F32),
            Marker::F64 => Some(ScalarKind::F64),
            Marker::Str => Some(ScalarKind::Str),
            _ => None,
        }
    }

    /// Value marker for a scalar kind.
    #[must_use]
    pub fn of_scalar_kind(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::Bool => Marker::Bool,
            ScalarKind::I32 => Marker::I32,
            ScalarKind::U32 => Marker::U32,
            ScalarKind::I64 => Marker::I64,
            ScalarKind::U64 => Marker::U64,
            ScalarKind::F32 => Marker::F32,
            ScalarKind::F64 => Marker::F64,
            ScalarKind::Str => Marker::Str,
        }
    }

    /// True for markers that open a container.
    #[inline]
    #[must_use]
    pub fn opens_container(self) -> bool {
        matches!(self, Marker::ArrayBegin | Marker::ListBegin | Marker::ObjectBegin)
    }

    /// True for markers that close a container.
    #[inline]
    #[must_use]
    pub fn closes_container(self) -> bool {
        matches!(self, Marker::ArrayEnd | Marker::ListEnd | Marker::ObjectEnd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [(u8, Marker); 17] = [
        (0x00, Marker::Null),
        (0x01, Marker::Bool),
        (0x02, Marker::I32),
        (0x03, Marker::U32),
        (0x04, Marker::I64),
        (0x05, Marker::U64),
        (0x06, Marker::F32),
        (0x07, Marker::F64),
        (0x08, Marker::F80),
        (0x09, Marker::Str),
        (0x10, Marker::ArrayBegin),
        (0x11, Marker::ArrayEnd),
        (0x12, Marker::ListBegin),
        (0x13, Marker::ListEnd),
        (0x14, Marker::ObjectBegin),
        (0x15, Marker::ObjectEnd),
        (0x16, Marker::Name),
    ];

    #[test]
    fn every_marker_byte_round_trips() {
        for (byte, marker) in ALL {
            assert_eq!(Marker::from_byte(byte), Ok(marker));
            assert_eq!(marker.byte(), byte);
        }
    }

    #[test]
    fn unknown_bytes_are_rejected() {
        for byte in (0u8..=255).filter(|b| !ALL.iter().any(|(known, _)| known == b)) {
            assert_eq!(
                Marker::from_byte(byte),
                Err(Error::UndefinedValueType { tag: byte }),
                "byte {byte:#04x} must not parse"
            );
        }
    }

    #[test]
    fn scalar_kind_mapping_is_inverse() {
        for kind in [
            ScalarKind::Bool,
            ScalarKind::I32,
            ScalarKind::U32,
            ScalarKind::I64,
            ScalarKind::U64,
            ScalarKind::F32,
            ScalarKind::F64,
            ScalarKind::Str,
        ] {
            assert_eq!(Marker::of_scalar_kind(kind).scalar_kind(), Some(kind));
        }
        assert_eq!(Marker::F80.scalar_kind(), None);
        assert_eq!(Marker::ListBegin.scalar_kind(), None);
    }

    #[test]
    fn container_classification() {
        assert!(Marker::ObjectBegin.opens_container());
        assert!(Marker::ArrayBegin.opens_container());
        assert!(Marker::ListEnd.closes_container());
        assert!(!Marker::Name.opens_container());
        assert!(!Marker::I64.closes_container());
    }
}
