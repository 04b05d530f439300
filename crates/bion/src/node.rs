//! The variant value engine.
//!
//! A [`Node`] is a recursive, tagged tree value: nothing, one scalar, a
//! homogeneous typed array, an ordered list of child nodes, or an ordered
//! set of named child nodes. Containers own their children exclusively;
//! cloning a container deep-copies the subtree and moving it transfers
//! ownership. A node's kind never changes implicitly - only `clear`, the
//! `set_as_*` methods and whole-node assignment re-shape it.
//!
//! Two iteration protocols are offered: [`Node::items`] walks any container
//! and materializes each element as a boxed [`Node`], while
//! [`Node::scalars`] borrows the typed elements of an array directly so hot
//! loops over homogeneous data skip the per-element boxing.

use std::fmt;

use crate::error::{Error, Result};
use crate::scalar::{Scalar, ScalarKind, ScalarValue};

/// Mutually exclusive shape of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Null,
    Scalar,
    Array,
    List,
    Parent,
}

impl Kind {
    /// Get the kind name as a string (for error messages).
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Scalar => "scalar",
            Kind::Array => "array",
            Kind::List => "list",
            Kind::Parent => "parent",
        }
    }
}

/// Homogeneous backing storage of an array node, one vector per scalar
/// kind. The element type is fixed when the storage is created; values of
/// another type are converted on entry or rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Bool(Vec<bool>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Str(Vec<String>),
}

macro_rules! on_vec {
    ($data:expr, $vec:ident => $body:expr) => {
        match $data {
            ArrayData::Bool($vec) => $body,
            ArrayData::I32($vec) => $body,
            ArrayData::U32($vec) => $body,
            ArrayData::I64($vec) => $body,
            ArrayData::U64($vec) => $body,
            ArrayData::F32($vec) => $body,
            ArrayData::F64($vec) => $body,
            ArrayData::Str($vec) => $body,
        }
    };
}

macro_rules! with_coerced {
    ($data:expr, $value:expr, $vec:ident, $x:ident => $body:expr) => {{
        let coerced = $value.coerce($data.kind())?;
        match ($data, coerced) {
            (ArrayData::Bool($vec), Scalar::Bool($x)) => $body,
            (ArrayData::I32($vec), Scalar::I32($x)) => $body,
            (ArrayData::U32($vec), Scalar::U32($x)) => $body,
            (ArrayData::I64($vec), Scalar::I64($x)) => $body,
            (ArrayData::U64($vec), Scalar::U64($x)) => $body,
            (ArrayData::F32($vec), Scalar::F32($x)) => $body,
            (ArrayData::F64($vec), Scalar::F64($x)) => $body,
            (ArrayData::Str($vec), Scalar::Str($x)) => $body,
            _ => unreachable!("coercion yields the storage kind"),
        }
    }};
}

impl ArrayData {
    /// Empty storage for elements of `kind`.
    #[must_use]
    pub fn new(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::Bool => ArrayData::Bool(Vec::new()),
            ScalarKind::I32 => ArrayData::I32(Vec::new()),
            ScalarKind::U32 => ArrayData::U32(Vec::new()),
            ScalarKind::I64 => ArrayData::I64(Vec::new()),
            ScalarKind::U64 => ArrayData::U64(Vec::new()),
            ScalarKind::F32 => ArrayData::F32(Vec::new()),
            ScalarKind::F64 => ArrayData::F64(Vec::new()),
            ScalarKind::Str => ArrayData::Str(Vec::new()),
        }
    }

    /// Fixed element kind of this storage.
    #[must_use]
    pub fn kind(&self) -> ScalarKind {
        match self {
            ArrayData::Bool(_) => ScalarKind::Bool,
            ArrayData::I32(_) => ScalarKind::I32,
            ArrayData::U32(_) => ScalarKind::U32,
            ArrayData::I64(_) => ScalarKind::I64,
            ArrayData::U64(_) => ScalarKind::U64,
            ArrayData::F32(_) => ScalarKind::F32,
            ArrayData::F64(_) => ScalarKind::F64,
            ArrayData::Str(_) => ScalarKind::Str,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        on_vec!(self, v => v.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Boxed copy of the element at `index`.
    #[must_use]
    pub fn scalar_at(&self, index: usize) -> Option<Scalar> {
        match self {
            ArrayData::Bool(v) => v.get(index).map(|x| Scalar::Bool(*x)),
            ArrayData::I32(v) => v.get(index).map(|x| Scalar::I32(*x)),
            ArrayData::U32(v) => v.get(index).map(|x| Scalar::U32(*x)),
            ArrayData::I64(v) => v.get(index).map(|x| Scalar::I64(*x)),
            ArrayData::U64(v) => v.get(index).map(|x| Scalar::U64(*x)),
            ArrayData::F32(v) => v.get(index).map(|x| Scalar::F32(*x)),
            ArrayData::F64(v) => v.get(index).map(|x| Scalar::F64(*x)),
            ArrayData::Str(v) => v.get(index).map(|x| Scalar::Str(x.clone())),
        }
    }

    /// Append `value`, converting it to the element kind first.
    pub fn push(&mut self, value: Scalar) -> Result<()> {
        with_coerced!(self, value, vec, x => vec.push(x));
        Ok(())
    }

    /// Insert `value` at `index`, converting it to the element kind first.
    pub fn insert(&mut self, index: usize, value: Scalar) -> Result<()> {
        if index > self.len() {
            return Err(Error::IndexOutOfBounds {
                index,
                len: self.len(),
            });
        }
        with_coerced!(self, value, vec, x => vec.insert(index, x));
        Ok(())
    }

    /// Overwrite the element at `index`, converting `value` first.
    pub fn set(&mut self, index: usize, value: Scalar) -> Result<()> {
        if index >= self.len() {
            return Err(Error::IndexOutOfBounds {
                index,
                len: self.len(),
            });
        }
        with_coerced!(self, value, vec, x => vec[index] = x);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Scalar> {
        let taken = self.scalar_at(index).ok_or(Error::IndexOutOfBounds {
            index,
            len: self.len(),
        })?;
        on_vec!(self, v => { v.remove(index); });
        Ok(taken)
    }

    pub fn truncate(&mut self, len: usize) {
        on_vec!(self, v => v.truncate(len));
    }

    pub fn swap(&mut self, a: usize, b: usize) {
        on_vec!(self, v => v.swap(a, b));
    }
}

/// A recursive, self-describing tree value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Node {
    /// The default, empty state.
    #[default]
    Null,
    /// One typed leaf value.
    Scalar(Scalar),
    /// Homogeneous sequence of one scalar kind.
    Array(ArrayData),
    /// Ordered, unnamed children of arbitrary shape.
    List(Vec<Node>),
    /// Ordered, named children of arbitrary shape. Traversal order is
    /// insertion order; name uniqueness is not enforced here.
    Parent(Vec<(String, Node)>),
}

impl Node {
    /// Empty array node with elements of `kind`.
    #[must_use]
    pub fn array(kind: ScalarKind) -> Self {
        Node::Array(ArrayData::new(kind))
    }

    /// Empty list node.
    #[must_use]
    pub fn list() -> Self {
        Node::List(Vec::new())
    }

    /// Empty parent node.
    #[must_use]
    pub fn parent() -> Self {
        Node::Parent(Vec::new())
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Node::Null => Kind::Null,
            Node::Scalar(_) => Kind::Scalar,
            Node::Array(_) => Kind::Array,
            Node::List(_) => Kind::List,
            Node::Parent(_) => Kind::Parent,
        }
    }

    /// Element or child count; 0 for null and scalar nodes.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Node::Null | Node::Scalar(_) => 0,
            Node::Array(data) => data.len(),
            Node::List(children) => children.len(),
            Node::Parent(children) => children.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Element kind when this node is an array.
    #[must_use]
    pub fn array_kind(&self) -> Option<ScalarKind> {
        match self {
            Node::Array(data) => Some(data.kind()),
            _ => None,
        }
    }

    // --- explicit re-initialization ---

    /// Reset to the null state, dropping any owned children.
    pub fn clear(&mut self) {
        *self = Node::Null;
    }

    /// Reset to an empty array of `kind`.
    pub fn set_as_array(&mut self, kind: ScalarKind) {
        *self = Node::array(kind);
    }

    /// Reset to an empty list.
    pub fn set_as_list(&mut self) {
        *self = Node::list();
    }

    /// Reset to an empty parent.
    pub fn set_as_parent(&mut self) {
        *self = Node::parent();
    }

    // --- whole-node scalar access ---

    /// Read this node's scalar value as `T`, converting where safe.
    pub fn value<T: ScalarValue>(&self) -> Result<T> {
        match self {
            Node::Scalar(s) => T::from_scalar(s),
            other => Err(Error::WrongScalarType(other.kind().name())),
        }
    }

    /// Replace this node with the scalar `value`.
    pub fn set_value<T: ScalarValue>(&mut self, value: T) {
        *self = Node::Scalar(value.into_scalar());
    }

    // --- element access ---

    /// Read the element at `index` as `T`, converting where safe.
    pub fn get<T: ScalarValue>(&self, index: usize) -> Result<T> {
        match self {
            Node::Array(data) => {
                let s = data.scalar_at(index).ok_or(Error::IndexOutOfBounds {
                    index,
                    len: data.len(),
                })?;
                T::from_scalar(&s)
            }
            Node::List(_) | Node::Parent(_) => self
                .child(index)
                .ok_or(Error::IndexOutOfBounds {
                    index,
                    len: self.size(),
                })?
                .value(),
            other => Err(Error::UndefinedContainerType(other.kind().name())),
        }
    }

    /// Overwrite the element at `index` with the scalar `value`.
    pub fn set<T: ScalarValue>(&mut self, index: usize, value: T) -> Result<()> {
        let len = self.size();
        match self {
            Node::Array(data) => data.set(index, value.into_scalar()),
            Node::List(children) => {
                let child = children
                    .get_mut(index)
                    .ok_or(Error::IndexOutOfBounds { index, len })?;
                child.set_value(value);
                Ok(())
            }
            Node::Parent(children) => {
                let (_, child) = children
                    .get_mut(index)
                    .ok_or(Error::IndexOutOfBounds { index, len })?;
                child.set_value(value);
                Ok(())
            }
            other => Err(Error::UndefinedContainerType(other.kind().name())),
        }
    }

    /// Append the scalar `value` to an array or list.
    pub fn push<T: ScalarValue>(&mut self, value: T) -> Result<()> {
        match self {
            Node::Array(data) => data.push(value.into_scalar()),
            Node::List(children) => {
                children.push(Node::Scalar(value.into_scalar()));
                Ok(())
            }
            other => Err(Error::UndefinedContainerType(other.kind().name())),
        }
    }

    /// Insert the scalar `value` at `index`, shifting later elements.
    pub fn insert_item<T: ScalarValue>(&mut self, index: usize, value: T) -> Result<()> {
        let len = self.size();
        match self {
            Node::Array(data) => data.insert(index, value.into_scalar()),
            Node::List(children) => {
                if index > len {
                    return Err(Error::IndexOutOfBounds { index, len });
                }
                children.insert(index, Node::Scalar(value.into_scalar()));
                Ok(())
            }
            other => Err(Error::UndefinedContainerType(other.kind().name())),
        }
    }

    /// Append `child`, transferring ownership into this container.
    ///
    /// Lists take any child; arrays take scalar children by conversion.
    pub fn add_child(&mut self, child: impl Into<Node>) -> Result<()> {
        let child = child.into();
        match self {
            Node::List(children) => {
                children.push(child);
                Ok(())
            }
            Node::Array(data) => match child {
                Node::Scalar(s) => data.push(s),
                other => Err(Error::WrongScalarType(other.kind().name())),
            },
            other => Err(Error::UndefinedContainerType(other.kind().name())),
        }
    }

    /// Insert `child` at `index` of a list, shifting later children.
    pub fn insert_child(&mut self, index: usize, child: impl Into<Node>) -> Result<()> {
        let len = self.size();
        match self {
            Node::List(children) => {
                if index > len {
                    return Err(Error::IndexOutOfBounds { index, len });
                }
                children.insert(index, child.into());
                Ok(())
            }
            other => Err(Error::UndefinedContainerType(other.kind().name())),
        }
    }

    /// Append a named child to a parent, transferring ownership.
    pub fn add_named(&mut self, name: impl Into<String>, child: impl Into<Node>) -> Result<()> {
        match self {
            Node::Parent(children) => {
                children.push((name.into(), child.into()));
                Ok(())
            }
            other => Err(Error::UndefinedContainerType(other.kind().name())),
        }
    }

    /// Remove the element at `index`, shifting later elements down.
    pub fn erase_element(&mut self, index: usize) -> Result<()> {
        let len = self.size();
        match self {
            Node::Array(data) => data.remove(index).map(|_| ()),
            Node::List(children) => {
                if index >= len {
                    return Err(Error::IndexOutOfBounds { index, len });
                }
                children.remove(index);
                Ok(())
            }
            Node::Parent(children) => {
                if index >= len {
                    return Err(Error::IndexOutOfBounds { index, len });
                }
                children.remove(index);
                Ok(())
            }
            other => Err(Error::UndefinedContainerType(other.kind().name())),
        }
    }

    /// Drop every element from `index` to the end.
    pub fn erase_from(&mut self, index: usize) -> Result<()> {
        match self {
            Node::Array(data) => {
                data.truncate(index);
                Ok(())
            }
            Node::List(children) => {
                children.truncate(index);
                Ok(())
            }
            Node::Parent(children) => {
                children.truncate(index);
                Ok(())
            }
            other => Err(Error::UndefinedContainerType(other.kind().name())),
        }
    }

    /// Exchange the elements at `a` and `b`.
    pub fn swap_elements(&mut self, a: usize, b: usize) -> Result<()> {
        let len = self.size();
        if a >= len || b >= len {
            return Err(Error::IndexOutOfBounds {
                index: a.max(b),
                len,
            });
        }
        match self {
            Node::Array(data) => data.swap(a, b),
            Node::List(children) => children.swap(a, b),
            Node::Parent(children) => children.swap(a, b),
            _ => unreachable!("len > 0 implies a container"),
        }
        Ok(())
    }

    // --- lookup ---

    /// Position of the first element equal to `value`, by linear scan.
    #[must_use]
    pub fn index_of_value<T: ScalarValue>(&self, value: &T) -> Option<usize> {
        (0..self.size()).find(|&i| match self.get::<T>(i) {
            Ok(element) => element == *value,
            Err(_) => false,
        })
    }

    /// Position of the first child named `name`, by linear scan.
    #[must_use]
    pub fn index_of_name(&self, name: &str) -> Option<usize> {
        match self {
            Node::Parent(children) => children.iter().position(|(n, _)| n == name),
            _ => None,
        }
    }

    /// Name of the child at `index` of a parent.
    #[must_use]
    pub fn name_at(&self, index: usize) -> Option<&str> {
        match self {
            Node::Parent(children) => children.get(index).map(|(n, _)| n.as_str()),
            _ => None,
        }
    }

    // --- borrowing child access ---

    #[must_use]
    pub fn child(&self, index: usize) -> Option<&Node> {
        match self {
            Node::List(children) => children.get(index),
            Node::Parent(children) => children.get(index).map(|(_, n)| n),
            _ => None,
        }
    }

    #[must_use]
    pub fn child_mut(&mut self, index: usize) -> Option<&mut Node> {
        match self {
            Node::List(children) => children.get_mut(index),
            Node::Parent(children) => children.get_mut(index).map(|(_, n)| n),
            _ => None,
        }
    }

    /// Borrow the first child named `name`.
    #[must_use]
    pub fn named(&self, name: &str) -> Option<&Node> {
        let index = self.index_of_name(name)?;
        self.child(index)
    }

    #[must_use]
    pub fn named_mut(&mut self, name: &str) -> Option<&mut Node> {
        let index = self.index_of_name(name)?;
        self.child_mut(index)
    }

    // --- extraction ---

    /// Remove the child at `index` and hand it to the caller.
    pub fn take_child(&mut self, index: usize) -> Result<Node> {
        let len = self.size();
        match self {
            Node::Array(data) => data.remove(index).map(Node::Scalar),
            Node::List(children) => {
                if index >= len {
                    return Err(Error::IndexOutOfBounds { index, len });
                }
                Ok(children.remove(index))
            }
            Node::Parent(children) => {
                if index >= len {
                    return Err(Error::IndexOutOfBounds { index, len });
                }
                Ok(children.remove(index).1)
            }
            other => Err(Error::UndefinedContainerType(other.kind().name())),
        }
    }

    /// Remove the first child named `name` and hand it to the caller.
    pub fn take_named(&mut self, name: &str) -> Option<Node> {
        let index = self.index_of_name(name)?;
        match self {
            Node::Parent(children) => Some(children.remove(index).1),
            _ => None,
        }
    }

    // --- iteration ---

    /// Walk the elements of any container, each boxed as a [`Node`].
    ///
    /// Null and scalar nodes yield nothing. Array elements are copied into
    /// fresh scalar nodes; use [`Node::scalars`] to avoid that on the
    /// homogeneous path.
    #[must_use]
    pub fn items(&self) -> Items<'_> {
        Items {
            node: self,
            index: 0,
        }
    }

    /// Borrow the typed elements of an `Array(T)` directly, unboxed.
    ///
    /// Fails unless this node is an array whose element kind is exactly
    /// `T`; no conversion is attempted on this path.
    pub fn scalars<T: ScalarValue>(&self) -> Result<&[T]> {
        match self {
            Node::Array(data) => T::slice_of(data).ok_or(Error::TypeMismatch {
                expected: T::KIND.name(),
                found: data.kind().name(),
            }),
            other => Err(Error::UndefinedContainerType(other.kind().name())),
        }
    }

    /// Mutably borrow the typed elements of an `Array(T)`, unboxed.
    pub fn scalars_mut<T: ScalarValue>(&mut self) -> Result<&mut [T]> {
        match self {
            Node::Array(data) => {
                let found = data.kind().name();
                T::slice_of_mut(data).ok_or(Error::TypeMismatch {
                    expected: T::KIND.name(),
                    found,
                })
            }
            other => Err(Error::UndefinedContainerType(other.kind().name())),
        }
    }
}

/// Boxed element iterator returned by [`Node::items`].
pub struct Items<'a> {
    node: &'a Node,
    index: usize,
}

impl Iterator for Items<'_> {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        let i = self.index;
        self.index += 1;
        match self.node {
            Node::Array(data) => data.scalar_at(i).map(Node::Scalar),
            Node::List(children) => children.get(i).cloned(),
            Node::Parent(children) => children.get(i).map(|(_, n)| n.clone()),
            _ => None,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.node.size().saturating_sub(self.index);
        (rest, Some(rest))
    }
}

impl ExactSizeIterator for Items<'_> {}

impl From<Scalar> for Node {
    fn from(value: Scalar) -> Self {
        Node::Scalar(value)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::Scalar(Scalar::Str(value.to_string()))
    }
}

macro_rules! node_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Node {
                fn from(value: $ty) -> Self {
                    Node::Scalar(value.into_scalar())
                }
            }
        )*
    };
}

node_from!(bool, i32, u32, i64, u64, f32, f64, String);

impl<T: ScalarValue> FromIterator<T> for Node {
    /// Collect typed values into an `Array(T)` node.
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Node::Array(T::vec_into(iter.into_iter().collect()))
    }
}

impl fmt::Display for Node {
    /// Compact single-line tree literal: arrays carry their element kind,
    /// lists use brackets, parents use braces.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Null => write!(f, "null"),
            Node::Scalar(s) => write!(f, "{s}"),
            Node::Array(data) => {
                write!(f, "{}[", data.kind().name())?;
                for i in 0..data.len() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match data.scalar_at(i) {
                        Some(s) => write!(f, "{s}")?,
                        None => unreachable!(),
                    }
                }
                write!(f, "]")
            }
            Node::List(children) => {
                write!(f, "[")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, "]")
            }
            Node::Parent(children) => {
                write!(f, "{{")?;
                for (i, (name, child)) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {child}")?;
                }
                write!(f, "}}")
            }
        }
    }
}
