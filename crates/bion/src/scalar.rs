//! Scalar payloads and the coercion engine.
//!
//! A [`Scalar`] is one leaf value with its concrete type; [`ScalarKind`]
//! is the type alone. The [`ScalarValue`] trait connects Rust primitive
//! types to both, and carries the conversion rules used by every typed
//! accessor: numeric reads attempt widening/narrowing first and only
//! report failures (out-of-range, not-a-number), never reinterpretation.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, Result};
use crate::node::ArrayData;

/// Concrete type of a scalar payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Str,
}

impl ScalarKind {
    /// Get the type name as a string (for error messages).
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::I32 => "i32",
            ScalarKind::U32 => "u32",
            ScalarKind::I64 => "i64",
            ScalarKind::U64 => "u64",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::Str => "str",
        }
    }

    /// Byte width of one untagged wire element, 0 for strings
    /// (strings are zero-terminated, not fixed-width).
    #[must_use]
    pub fn wire_width(self) -> u8 {
        match self {
            ScalarKind::Bool => 1,
            ScalarKind::I32 | ScalarKind::U32 | ScalarKind::F32 => 4,
            ScalarKind::I64 | ScalarKind::U64 | ScalarKind::F64 => 8,
            ScalarKind::Str => 0,
        }
    }
}

/// A single typed scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
}

impl Scalar {
    /// Concrete type of this payload.
    #[must_use]
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::Bool(_) => ScalarKind::Bool,
            Scalar::I32(_) => ScalarKind::I32,
            Scalar::U32(_) => ScalarKind::U32,
            Scalar::I64(_) => ScalarKind::I64,
            Scalar::U64(_) => ScalarKind::U64,
            Scalar::F32(_) => ScalarKind::F32,
            Scalar::F64(_) => ScalarKind::F64,
            Scalar::Str(_) => ScalarKind::Str,
        }
    }

    /// Convert this payload to the given kind, applying the same rules as
    /// the typed accessors.
    pub fn coerce(&self, kind: ScalarKind) -> Result<Scalar> {
        Ok(match kind {
            ScalarKind::Bool => Scalar::Bool(bool::from_scalar(self)?),
            ScalarKind::I32 => Scalar::I32(i32::from_scalar(self)?),
            ScalarKind::U32 => Scalar::U32(u32::from_scalar(self)?),
            ScalarKind::I64 => Scalar::I64(i64::from_scalar(self)?),
            ScalarKind::U64 => Scalar::U64(u64::from_scalar(self)?),
            ScalarKind::F32 => Scalar::F32(f32::from_scalar(self)?),
            ScalarKind::F64 => Scalar::F64(f64::from_scalar(self)?),
            ScalarKind::Str => Scalar::Str(String::from_scalar(self)?),
        })
    }

    /// Widened integer view for numeric conversions; None for
    /// non-integer payloads.
    fn as_wide_int(&self) -> Option<i128> {
        match self {
            Scalar::I32(v) => Some(i128::from(*v)),
            Scalar::U32(v) => Some(i128::from(*v)),
            Scalar::I64(v) => Some(i128::from(*v)),
            Scalar::U64(v) => Some(i128::from(*v)),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::I32(v) => write!(f, "{v}"),
            Scalar::U32(v) => write!(f, "{v}"),
            Scalar::I64(v) => write!(f, "{v}"),
            Scalar::U64(v) => write!(f, "{v}"),
            Scalar::F32(v) => write!(f, "{v}"),
            Scalar::F64(v) => write!(f, "{v}"),
            Scalar::Str(v) => write!(f, "{v:?}"),
        }
    }
}

fn mismatch(expected: &'static str, found: &Scalar) -> Error {
    Error::TypeMismatch {
        expected,
        found: found.kind().name(),
    }
}

/// A float converts to an integer only when it is finite and whole.
fn int_from_float(value: f64) -> Option<i128> {
    if !value.is_finite() || value.fract() != 0.0 {
        return None;
    }
    if value < i128::MIN as f64 || value > i128::MAX as f64 {
        return None;
    }
    Some(value as i128)
}

/// Trait for Rust types that map onto a scalar payload.
///
/// Besides the conversions, each implementation knows how to view the
/// homogeneous [`ArrayData`] storage of its own kind, which is what makes
/// unboxed scalar iteration possible.
pub trait ScalarValue: Sized + Clone + PartialEq + fmt::Debug {
    /// The payload kind this type maps to.
    const KIND: ScalarKind;

    /// Wrap this value as a payload.
    fn into_scalar(self) -> Scalar;

    /// Convert from any payload, applying safe numeric/string conversions.
    fn from_scalar(scalar: &Scalar) -> Result<Self>;

    /// Three-way compare used by the ordered-map layer.
    fn compare(&self, other: &Self) -> Ordering;

    /// Borrow the typed elements of matching array storage.
    fn slice_of(data: &ArrayData) -> Option<&[Self]>;

    /// Mutably borrow the typed elements of matching array storage.
    fn slice_of_mut(data: &mut ArrayData) -> Option<&mut [Self]>;

    /// Take the typed elements out of matching array storage.
    fn vec_of(data: ArrayData) -> Option<Vec<Self>>;

    /// Build array storage from typed elements.
    fn vec_into(items: Vec<Self>) -> ArrayData;
}

macro_rules! array_hooks {
    ($variant:ident) => {
        fn slice_of(data: &ArrayData) -> Option<&[Self]> {
            match data {
                ArrayData::$variant(v) => Some(v.as_slice()),
                _ => None,
            }
        }

        fn slice_of_mut(data: &mut ArrayData) -> Option<&mut [Self]> {
            match data {
                ArrayData::$variant(v) => Some(v.as_mut_slice()),
                _ => None,
            }
        }

        fn vec_of(data: ArrayData) -> Option<Vec<Self>> {
            match data {
                ArrayData::$variant(v) => Some(v),
                _ => None,
            }
        }

        fn vec_into(items: Vec<Self>) -> ArrayData {
            ArrayData::$variant(items)
        }
    };
}

macro_rules! int_scalar {
    ($ty:ty, $variant:ident) => {
        impl ScalarValue for $ty {
            const KIND: ScalarKind = ScalarKind::$variant;

            fn into_scalar(self) -> Scalar {
                Scalar::$variant(self)
            }

            fn from_scalar(scalar: &Scalar) -> Result<Self> {
                match scalar {
                    Scalar::$variant(v) => Ok(*v),
                    Scalar::Bool(_) => Err(mismatch(stringify!($ty), scalar)),
                    Scalar::Str(s) => s
                        .trim()
                        .parse::<$ty>()
                        .map_err(|_| mismatch(stringify!($ty), scalar)),
                    Scalar::F32(v) => int_from_float(f64::from(*v))
                        .and_then(|wide| <$ty>::try_from(wide).ok())
                        .ok_or_else(|| mismatch(stringify!($ty), scalar)),
                    Scalar::F64(v) => int_from_float(*v)
                        .and_then(|wide| <$ty>::try_from(wide).ok())
                        .ok_or_else(|| mismatch(stringify!($ty), scalar)),
                    other => other
                        .as_wide_int()
                        .and_then(|wide| <$ty>::try_from(wide).ok())
                        .ok_or_else(|| mismatch(stringify!($ty), scalar)),
                }
            }

            fn compare(&self, other: &Self) -> Ordering {
                Ord::cmp(self, other)
            }

            array_hooks!($variant);
        }
    };
}

int_scalar!(i32, I32);
int_scalar!(u32, U32);
int_scalar!(i64, I64);
int_scalar!(u64, U64);

macro_rules! float_scalar {
    ($ty:ty, $variant:ident) => {
        impl ScalarValue for $ty {
            const KIND: ScalarKind = ScalarKind::$variant;

            fn into_scalar(self) -> Scalar {
                Scalar::$variant(self)
            }

            #[allow(clippy::cast_lossless, clippy::unnecessary_cast)]
            fn from_scalar(scalar: &Scalar) -> Result<Self> {
                match scalar {
                    Scalar::F32(v) => Ok(f64::from(*v) as $ty),
                    Scalar::F64(v) => Ok(*v as $ty),
                    Scalar::I32(v) => Ok(*v as $ty),
                    Scalar::U32(v) => Ok(*v as $ty),
                    Scalar::I64(v) => Ok(*v as $ty),
                    Scalar::U64(v) => Ok(*v as $ty),
                    Scalar::Str(s) => s
                        .trim()
                        .parse::<$ty>()
                        .map_err(|_| mismatch(stringify!($ty), scalar)),
                    Scalar::Bool(_) => Err(mismatch(stringify!($ty), scalar)),
                }
            }

            fn compare(&self, other: &Self) -> Ordering {
                self.total_cmp(other)
            }

            array_hooks!($variant);
        }
    };
}

float_scalar!(f32, F32);
float_scalar!(f64, F64);

impl ScalarValue for bool {
    const KIND: ScalarKind = ScalarKind::Bool;

    fn into_scalar(self) -> Scalar {
        Scalar::Bool(self)
    }

    fn from_scalar(scalar: &Scalar) -> Result<Self> {
        match scalar {
            Scalar::Bool(v) => Ok(*v),
            Scalar::Str(s) => match s.trim() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(mismatch("bool", scalar)),
            },
            _ => Err(mismatch("bool", scalar)),
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        Ord::cmp(self, other)
    }

    array_hooks!(Bool);
}

impl ScalarValue for String {
    const KIND: ScalarKind = ScalarKind::Str;

    fn into_scalar(self) -> Scalar {
        Scalar::Str(self)
    }

    fn from_scalar(scalar: &Scalar) -> Result<Self> {
        Ok(match scalar {
            Scalar::Str(s) => s.clone(),
            Scalar::Bool(v) => v.to_string(),
            Scalar::I32(v) => v.to_string(),
            Scalar::U32(v) => v.to_string(),
            Scalar::I64(v) => v.to_string(),
            Scalar::U64(v) => v.to_string(),
            Scalar::F32(v) => v.to_string(),
            Scalar::F64(v) => v.to_string(),
        })
    }

    fn compare(&self, other: &Self) -> Ordering {
        Ord::cmp(self, other)
    }

    array_hooks!(Str);
}
