//! Streaming tree reader.
//!
//! Decoding is split in two. A cursor tokenizes the byte stream; a
//! [`TreeBuilder`] consumes tokens one at a time and rebuilds the tree.
//! The builder is a push-down state machine rather than a recursive
//! parser, so any external event source can drive it token by token: its
//! stack of open frames is the path from the root to the current
//! insertion point, and each frame owns its partially built node until it
//! is popped and attached to the frame below.
//!
//! A generic `BeginArray` opens a container whose concrete shape is still
//! unknown. The next token decides it: a type tag selects typed-array
//! mode, a nested struct selects list mode, and a tagged scalar fixes the
//! array's element type to its own. Member names arrive as their own
//! token and are held until the next value consumes them.
//!
//! Decode failures poison the whole attempt; the caller discards the
//! partial tree by dropping the builder.

use crate::error::{Error, Result};
use crate::node::{ArrayData, Node};
use crate::scalar::{Scalar, ScalarKind};
use crate::varint;
use crate::wire::marker::Marker;

/// One event of the token stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Null,
    Scalar(Scalar),
    /// Member name for the next value inside an object.
    Name(String),
    BeginObject,
    /// Heterogeneous children follow, each individually tagged.
    BeginList,
    /// Container of still-unknown shape; resolved by the next token.
    BeginArray,
    /// Fixes a pending array to typed-array mode with this element kind.
    TypeTag(ScalarKind),
    /// Closes the innermost open container.
    End,
}

/// Concrete shape of an open frame, or the two placeholder states.
enum Shape {
    /// The output root before its first token.
    Root,
    /// An array placeholder whose element type is not yet known.
    Pending,
    Array(ArrayData),
    List(Vec<Node>),
    Parent(Vec<(String, Node)>),
}

struct Frame {
    /// Name to attach under when the parent frame is an object.
    name: Option<String>,
    shape: Shape,
}

/// Push-down builder reconstructing a [`Node`] tree from tokens.
pub struct TreeBuilder {
    open: Vec<Frame>,
    pending_name: Option<String>,
    done: Option<Node>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    /// Builder with the stack holding only the untyped output root.
    #[must_use]
    pub fn new() -> Self {
        TreeBuilder {
            open: vec![Frame {
                name: None,
                shape: Shape::Root,
            }],
            pending_name: None,
            done: None,
        }
    }

    /// True once the root has been closed; further tokens are rejected.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.done.is_some()
    }

    /// Feed one token into the state machine.
    pub fn push(&mut self, token: Token) -> Result<()> {
        self.ensure_active()?;
        match token {
            Token::Null => self.push_value(Node::Null),
            Token::Scalar(scalar) => self.push_scalar(scalar),
            Token::Name(name) => {
                self.pending_name = Some(name);
                Ok(())
            }
            Token::BeginObject => self.open_container(Shape::Parent(Vec::new())),
            Token::BeginList => self.open_container(Shape::List(Vec::new())),
            Token::BeginArray => self.open_container(Shape::Pending),
            Token::TypeTag(kind) => self.resolve_type_tag(kind),
            Token::End => self.close(),
        }
    }

    /// Flush any still-open containers and hand back the finished root.
    pub fn finish(mut self) -> Result<Node> {
        loop {
            if let Some(node) = self.done.take() {
                return Ok(node);
            }
            match self.open.last() {
                // empty stream: the root never received a value
                Some(frame) if matches!(frame.shape, Shape::Root) => {
                    self.open.pop();
                    self.done = Some(Node::Null);
                }
                _ => self.close()?,
            }
        }
    }

    fn ensure_active(&self) -> Result<()> {
        if self.done.is_some() {
            return Err(Error::UndefinedContainerType("document already complete"));
        }
        Ok(())
    }

    fn open_container(&mut self, shape: Shape) -> Result<()> {
        match self.open.last_mut() {
            // the root placeholder becomes the container itself
            Some(frame) if matches!(frame.shape, Shape::Root) => {
                frame.shape = shape;
                return Ok(());
            }
            // an array whose first child is a struct is a list
            Some(frame) if matches!(frame.shape, Shape::Pending) => {
                frame.shape = Shape::List(Vec::new());
            }
            Some(frame) if matches!(frame.shape, Shape::Array(_)) => {
                return Err(Error::UndefinedContainerType("struct inside typed array"));
            }
            Some(_) => {}
            None => return Err(Error::UndefinedContainerType("no open container")),
        }
        let name = self.child_name()?;
        self.open.push(Frame { name, shape });
        Ok(())
    }

    fn resolve_type_tag(&mut self, kind: ScalarKind) -> Result<()> {
        match self.open.last_mut() {
            Some(frame) if matches!(frame.shape, Shape::Pending) => {
                frame.shape = Shape::Array(ArrayData::new(kind));
                Ok(())
            }
            _ => Err(Error::UndefinedContainerType("type tag outside array")),
        }
    }

    fn push_scalar(&mut self, scalar: Scalar) -> Result<()> {
        if matches!(self.open.last().map(|f| &f.shape), Some(Shape::Root)) {
            self.open.pop();
            self.done = Some(Node::Scalar(scalar));
            return Ok(());
        }
        let name = self.child_name()?;
        let frame = self
            .open
            .last_mut()
            .ok_or(Error::UndefinedContainerType("no open container"))?;
        match &mut frame.shape {
            // first scalar fixes the array's element type
            Shape::Pending => {
                let mut data = ArrayData::new(scalar.kind());
                data.push(scalar)?;
                frame.shape = Shape::Array(data);
                Ok(())
            }
            Shape::Array(data) => data.push(scalar),
            Shape::List(children) => {
                children.push(Node::Scalar(scalar));
                Ok(())
            }
            Shape::Parent(children) => match name {
                Some(name) => {
                    children.push((name, Node::Scalar(scalar)));
                    Ok(())
                }
                None => Err(Error::UndefinedContainerType("unnamed value in object")),
            },
            Shape::Root => unreachable!("root case handled above"),
        }
    }

    fn push_value(&mut self, node: Node) -> Result<()> {
        if matches!(self.open.last().map(|f| &f.shape), Some(Shape::Root)) {
            self.open.pop();
            self.done = Some(node);
            return Ok(());
        }
        let name = self.child_name()?;
        let frame = self
            .open
            .last_mut()
            .ok_or(Error::UndefinedContainerType("no open container"))?;
        match &mut frame.shape {
            // null cannot fix an element type, so the array degrades
            // to a list
            Shape::Pending => {
                frame.shape = Shape::List(vec![node]);
                Ok(())
            }
            Shape::Array(data) => Err(Error::TypeMismatch {
                expected: data.kind().name(),
                found: "null",
            }),
            Shape::List(children) => {
                children.push(node);
                Ok(())
            }
            Shape::Parent(children) => match name {
                Some(name) => {
                    children.push((name, node));
                    Ok(())
                }
                None => Err(Error::UndefinedContainerType("unnamed value in object")),
            },
            Shape::Root => unreachable!("root case handled above"),
        }
    }

    fn close(&mut self) -> Result<()> {
        let frame = self
            .open
            .pop()
            .ok_or(Error::UndefinedContainerType("end without open container"))?;
        let node = match frame.shape {
            Shape::Root => {
                return Err(Error::UndefinedContainerType("end without open container"));
            }
            // an array that never learned its type closes as an empty list
            Shape::Pending => Node::list(),
            Shape::Array(data) => Node::Array(data),
            Shape::List(children) => Node::List(children),
            Shape::Parent(children) => Node::Parent(children),
        };
        match self.open.last_mut() {
            None => {
                self.done = Some(node);
                Ok(())
            }
            Some(parent) => match &mut parent.shape {
                Shape::List(children) => {
                    children.push(node);
                    Ok(())
                }
                Shape::Parent(children) => {
                    let name = frame
                        .name
                        .ok_or(Error::UndefinedContainerType("unnamed value in object"))?;
                    children.push((name, node));
                    Ok(())
                }
                Shape::Array(_) => Err(Error::UndefinedContainerType("struct inside typed array")),
                Shape::Root | Shape::Pending => {
                    unreachable!("placeholders are resolved before children open")
                }
            },
        }
    }

    /// Name for a child about to be pushed; objects require one, and a
    /// dangling name anywhere else is malformed.
    fn child_name(&mut self) -> Result<Option<String>> {
        let top_is_parent = matches!(
            self.open.last().map(|f| &f.shape),
            Some(Shape::Parent(_))
        );
        if top_is_parent {
            Ok(Some(self.take_required_name()?))
        } else if self.pending_name.is_some() {
            Err(Error::UndefinedContainerType("name outside object"))
        } else {
            Ok(None)
        }
    }

    fn take_required_name(&mut self) -> Result<String> {
        self.pending_name
            .take()
            .ok_or(Error::UndefinedContainerType("unnamed value in object"))
    }
}

/// Byte-stream cursor feeding the tokenizer.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Cursor { bytes, pos: 0 }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn byte(&mut self) -> Result<u8> {
        let b = *self.bytes.get(self.pos).ok_or(Error::TruncatedValue)?;
        self.pos += 1;
        Ok(b)
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(count).ok_or(Error::TruncatedValue)?;
        let slice = self.bytes.get(self.pos..end).ok_or(Error::TruncatedValue)?;
        self.pos = end;
        Ok(slice)
    }

    /// Read up to the next NUL and step past it.
    fn cstr(&mut self) -> Result<String> {
        let rest = &self.bytes[self.pos..];
        let nul = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or(Error::TruncatedValue)?;
        let text = std::str::from_utf8(&rest[..nul])
            .map_err(|_| Error::WrongScalarType("string is not valid UTF-8"))?;
        self.pos += nul + 1;
        Ok(text.to_string())
    }

    fn varint(&mut self) -> Result<u32> {
        let (value, consumed) = varint::read_u32(&self.bytes[self.pos..])?;
        self.pos += consumed;
        Ok(value)
    }
}

/// Decode one tree from the front of `bytes`.
///
/// Returns the tree and the bytes consumed, so framing layers can keep
/// reading after it.
pub fn read_node(bytes: &[u8]) -> Result<(Node, usize)> {
    let mut cursor = Cursor::new(bytes);
    let mut builder = TreeBuilder::new();
    // expected close markers, outermost first; the builder checks shape,
    // this checks that begin/end marker pairs line up on the wire
    let mut expected_ends: Vec<Marker> = Vec::new();
    while !builder.is_complete() && !cursor.is_at_end() {
        let tag = cursor.byte()?;
        let marker = Marker::from_byte(tag)?;
        match marker {
            Marker::Null => builder.push(Token::Null)?,
            Marker::F80 => return Err(Error::UndefinedValueType { tag }),
            Marker::Bool
            | Marker::I32
            | Marker::U32
            | Marker::I64
            | Marker::U64
            | Marker::F32
            | Marker::F64
            | Marker::Str => match marker.scalar_kind() {
                Some(kind) => builder.push(Token::Scalar(read_payload(kind, &mut cursor)?))?,
                None => unreachable!("scalar markers map to a kind"),
            },
            Marker::Name => builder.push(Token::Name(cursor.cstr()?))?,
            Marker::ObjectBegin => {
                builder.push(Token::BeginObject)?;
                expected_ends.push(Marker::ObjectEnd);
            }
            Marker::ListBegin => {
                builder.push(Token::BeginList)?;
                expected_ends.push(Marker::ListEnd);
            }
            Marker::ObjectEnd | Marker::ListEnd => {
                if expected_ends.pop() != Some(marker) {
                    return Err(Error::UndefinedContainerType("mismatched container end"));
                }
                builder.push(Token::End)?;
            }
            Marker::ArrayBegin => read_typed_array(&mut cursor, &mut builder)?,
            Marker::ArrayEnd => {
                return Err(Error::UndefinedContainerType("array end without array"));
            }
        }
    }
    let consumed = cursor.pos;
    let node = builder.finish()?;
    tracing::trace!(consumed, "decoded node tree");
    Ok((node, consumed))
}

/// Decode a tree that must span the whole of `bytes`.
pub fn from_bytes(bytes: &[u8]) -> Result<Node> {
    let (node, consumed) = read_node(bytes)?;
    if consumed != bytes.len() {
        return Err(Error::UndefinedContainerType("trailing data after root"));
    }
    Ok(node)
}

/// Typed array: element descriptor, then `count` untagged payloads, then
/// the end marker. The count is known up front, so this drains inline.
fn read_typed_array(cursor: &mut Cursor<'_>, builder: &mut TreeBuilder) -> Result<()> {
    let kind_tag = cursor.byte()?;
    let kind = Marker::from_byte(kind_tag)?
        .scalar_kind()
        .ok_or(Error::UndefinedValueType { tag: kind_tag })?;
    let width = cursor.byte()?;
    if width != kind.wire_width() {
        return Err(Error::UndefinedValueType { tag: width });
    }
    let count = cursor.varint()?;
    builder.push(Token::BeginArray)?;
    builder.push(Token::TypeTag(kind))?;
    for _ in 0..count {
        builder.push(Token::Scalar(read_payload(kind, cursor)?))?;
    }
    let end = cursor.byte()?;
    if Marker::from_byte(end)? != Marker::ArrayEnd {
        return Err(Error::UndefinedContainerType("typed array not terminated"));
    }
    builder.push(Token::End)
}

/// Untagged scalar payload of a known kind, little-endian for numerics.
fn read_payload(kind: ScalarKind, cursor: &mut Cursor<'_>) -> Result<Scalar> {
    Ok(match kind {
        ScalarKind::Bool => match cursor.byte()? {
            0 => Scalar::Bool(false),
            1 => Scalar::Bool(true),
            _ => return Err(Error::WrongScalarType("bool payload")),
        },
        ScalarKind::I32 => Scalar::I32(i32::from_le_bytes(fixed(cursor.take(4)?)?)),
        ScalarKind::U32 => Scalar::U32(u32::from_le_bytes(fixed(cursor.take(4)?)?)),
        ScalarKind::I64 => Scalar::I64(i64::from_le_bytes(fixed(cursor.take(8)?)?)),
        ScalarKind::U64 => Scalar::U64(u64::from_le_bytes(fixed(cursor.take(8)?)?)),
        ScalarKind::F32 => Scalar::F32(f32::from_le_bytes(fixed(cursor.take(4)?)?)),
        ScalarKind::F64 => Scalar::F64(f64::from_le_bytes(fixed(cursor.take(8)?)?)),
        ScalarKind::Str => Scalar::Str(cursor.cstr()?),
    })
}

fn fixed<const N: usize>(slice: &[u8]) -> Result<[u8; N]> {
    slice.try_into().map_err(|_| Error::TruncatedValue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::writer::to_bytes;

    fn feed(tokens: impl IntoIterator<Item = Token>) -> Result<Node> {
        let mut builder = TreeBuilder::new();
        for token in tokens {
            builder.push(token)?;
        }
        builder.finish()
    }

    #[test]
    fn scalar_becomes_the_root() {
        let node = feed([Token::Scalar(Scalar::I32(7))]).unwrap();
        assert_eq!(node, Node::from(7i32));
    }

    #[test]
    fn empty_stream_yields_null_root() {
        assert_eq!(feed([]).unwrap(), Node::Null);
    }

    #[test]
    fn tokens_after_the_root_are_rejected() {
        let mut builder = TreeBuilder::new();
        builder.push(Token::Null).unwrap();
        assert!(builder.is_complete());
        assert_eq!(
            builder.push(Token::Null),
            Err(Error::UndefinedContainerType("document already complete"))
        );
    }

    #[test]
    fn first_scalar_fixes_the_array_type() {
        let node = feed([
            Token::BeginArray,
            Token::Scalar(Scalar::U32(1)),
            Token::Scalar(Scalar::U32(2)),
            Token::End,
        ])
        .unwrap();
        assert_eq!(node.scalars::<u32>().unwrap(), &[1, 2]);

        // later scalars convert into the fixed type or fail
        let err = feed([
            Token::BeginArray,
            Token::Scalar(Scalar::U32(1)),
            Token::Scalar(Scalar::Str("x".into())),
            Token::End,
        ])
        .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn struct_child_turns_a_pending_array_into_a_list() {
        let node = feed([
            Token::BeginArray,
            Token::BeginObject,
            Token::End,
            Token::Scalar(Scalar::I32(5)),
            Token::End,
        ])
        .unwrap();
        let Node::List(children) = node else {
            panic!("expected list");
        };
        assert_eq!(children.len(), 2);
        assert_eq!(children[0], Node::parent());
        assert_eq!(children[1], Node::from(5i32));
    }

    #[test]
    fn untyped_empty_array_closes_as_a_list() {
        let node = feed([Token::BeginArray, Token::End]).unwrap();
        assert_eq!(node, Node::list());
    }

    #[test]
    fn names_attach_to_the_next_value() {
        let node = feed([
            Token::BeginObject,
            Token::Name("a".into()),
            Token::Scalar(Scalar::I64(1)),
            Token::Name("b".into()),
            Token::BeginList,
            Token::End,
            Token::End,
        ])
        .unwrap();
        assert_eq!(node.name_at(0), Some("a"));
        assert_eq!(node.named("b"), Some(&Node::list()));
    }

    #[test]
    fn unnamed_object_member_is_malformed() {
        let err = feed([Token::BeginObject, Token::Scalar(Scalar::I32(1))]).unwrap_err();
        assert_eq!(err, Error::UndefinedContainerType("unnamed value in object"));
    }

    #[test]
    fn end_of_stream_flushes_open_containers() {
        let node = feed([
            Token::BeginObject,
            Token::Name("xs".into()),
            Token::BeginList,
            Token::Scalar(Scalar::Bool(true)),
            // both containers left open
        ])
        .unwrap();
        assert_eq!(node.named("xs").map(Node::size), Some(1));
    }

    #[test]
    fn decode_rejects_unknown_and_reserved_tags() {
        assert_eq!(
            from_bytes(&[0xAB]),
            Err(Error::UndefinedValueType { tag: 0xAB })
        );
        assert_eq!(
            from_bytes(&[0x08]),
            Err(Error::UndefinedValueType { tag: 0x08 })
        );
    }

    #[test]
    fn decode_rejects_mismatched_ends_and_trailing_data() {
        // object closed with a list end
        assert_eq!(
            from_bytes(&[0x14, 0x13]),
            Err(Error::UndefinedContainerType("mismatched container end"))
        );
        // root null followed by junk
        assert_eq!(
            from_bytes(&[0x00, 0x00]),
            Err(Error::UndefinedContainerType("trailing data after root"))
        );
    }

    #[test]
    fn decode_reports_truncation() {
        // i32 payload cut short
        assert_eq!(from_bytes(&[0x02, 0x01]), Err(Error::TruncatedValue));
        // string without its terminator
        assert_eq!(from_bytes(&[0x09, b'h']), Err(Error::TruncatedValue));
    }

    #[test]
    fn decodes_what_the_writer_emits() {
        let mut root = Node::parent();
        root.add_named("ints", [1i32, 2, 3].into_iter().collect::<Node>())
            .unwrap();
        let mut mixed = Node::list();
        mixed.add_child(Node::Null).unwrap();
        mixed.add_child("text").unwrap();
        root.add_named("mixed", mixed).unwrap();

        let bytes = to_bytes(&root).unwrap();
        assert_eq!(from_bytes(&bytes).unwrap(), root);
    }
}
