//! Sorted key/value semantics layered onto a [`Node`].
//!
//! An [`OrderedMap`] does not own a dedicated data structure; it drives a
//! plain node whose shape depends on the key type, chosen once at
//! construction:
//!
//! - string keys: the node is a parent, key = child name, value = child.
//!   Physical order is insertion order, so `sort` is a no-op and the
//!   bound queries fall back to a name scan.
//! - any other key: the node is a two-slot list holding `Array(K)` keys
//!   and a parallel value store, kept in lock-step at every mutation and
//!   kept ascending by key so lookups binary-search.
//!
//! Because the backing storage is just a node shape, a map round-trips
//! through the wire codec like any other tree.

use std::cmp::Ordering;
use std::marker::PhantomData;

use crate::error::{Error, Result};
use crate::node::{Kind, Node};
use crate::scalar::{Scalar, ScalarKind, ScalarValue};
use crate::sort::{self, PosAccess, PosRead};

/// Physical encoding behind a map, fixed at construction from the key
/// type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MapStorage {
    /// Parent node; key is the child name.
    Named,
    /// Two-slot list of parallel stores: `[Array(K), values]`.
    Indexed,
}

/// Value-side storage hooks for [`OrderedMap`].
///
/// Scalar values live in a typed array; tree values live in a list of
/// child nodes. Either way the store stays in index lock-step with the
/// key array.
pub trait MapValue: Sized + Clone + PartialEq + std::fmt::Debug {
    /// Fresh, empty value store of the right shape.
    fn empty_store() -> Node;

    /// Check that `store` has the shape this value type expects.
    fn check_store(store: &Node) -> Result<()>;

    /// Copy the value at `index` out of the store.
    fn read_at(store: &Node, index: usize) -> Result<Self>;

    /// Overwrite the value at `index`.
    fn write_at(store: &mut Node, index: usize, value: Self) -> Result<()>;

    /// Insert a value at `index`, shifting later values.
    fn insert_at(store: &mut Node, index: usize, value: Self) -> Result<()>;

    /// Wrap the value as a named-storage child node.
    fn into_node(self) -> Node;

    /// Unwrap a named-storage child node.
    fn from_node(node: &Node) -> Result<Self>;
}

macro_rules! scalar_map_value {
    ($($ty:ty),*) => {
        $(
            impl MapValue for $ty {
                fn empty_store() -> Node {
                    Node::array(<$ty as ScalarValue>::KIND)
                }

                fn check_store(store: &Node) -> Result<()> {
                    match store.array_kind() {
                        Some(kind) if kind == <$ty as ScalarValue>::KIND => Ok(()),
                        Some(kind) => Err(Error::TypeMismatch {
                            expected: <$ty as ScalarValue>::KIND.name(),
                            found: kind.name(),
                        }),
                        None => Err(Error::UndefinedContainerType(store.kind().name())),
                    }
                }

                fn read_at(store: &Node, index: usize) -> Result<Self> {
                    store.get(index)
                }

                fn write_at(store: &mut Node, index: usize, value: Self) -> Result<()> {
                    store.set(index, value)
                }

                fn insert_at(store: &mut Node, index: usize, value: Self) -> Result<()> {
                    store.insert_item(index, value)
                }

                fn into_node(self) -> Node {
                    Node::Scalar(self.into_scalar())
                }

                fn from_node(node: &Node) -> Result<Self> {
                    node.value()
                }
            }
        )*
    };
}

scalar_map_value!(bool, i32, u32, i64, u64, f32, f64, String);

impl MapValue for Node {
    fn empty_store() -> Node {
        Node::list()
    }

    fn check_store(store: &Node) -> Result<()> {
        match store.kind() {
            Kind::List => Ok(()),
            other => Err(Error::UndefinedContainerType(other.name())),
        }
    }

    fn read_at(store: &Node, index: usize) -> Result<Self> {
        store.child(index).cloned().ok_or(Error::IndexOutOfBounds {
            index,
            len: store.size(),
        })
    }

    fn write_at(store: &mut Node, index: usize, value: Self) -> Result<()> {
        let len = store.size();
        let slot = store
            .child_mut(index)
            .ok_or(Error::IndexOutOfBounds { index, len })?;
        *slot = value;
        Ok(())
    }

    fn insert_at(store: &mut Node, index: usize, value: Self) -> Result<()> {
        store.insert_child(index, value)
    }

    fn into_node(self) -> Node {
        self
    }

    fn from_node(node: &Node) -> Result<Self> {
        Ok(node.clone())
    }
}

/// Read-only key probe over the key array of indexed storage.
struct KeySlice<'a, K: ScalarValue> {
    keys: &'a [K],
}

impl<K: ScalarValue> PosRead for KeySlice<'_, K> {
    type Value = K;

    fn len(&self) -> usize {
        self.keys.len()
    }

    fn item(&self, index: usize) -> K {
        self.keys[index].clone()
    }

    fn compare(&self, index: usize, value: &K) -> Ordering {
        self.keys[index].compare(value)
    }
}

/// Lock-step view over the key array and value store for bulk sorting:
/// every swap applies to both sides at the same offsets.
struct PairAccess<'a, K: ScalarValue> {
    keys: &'a mut [K],
    values: &'a mut Node,
}

impl<K: ScalarValue> PosRead for PairAccess<'_, K> {
    type Value = K;

    fn len(&self) -> usize {
        self.keys.len()
    }

    fn item(&self, index: usize) -> K {
        self.keys[index].clone()
    }

    fn compare(&self, index: usize, value: &K) -> Ordering {
        self.keys[index].compare(value)
    }
}

impl<K: ScalarValue> PosAccess for PairAccess<'_, K> {
    fn swap_items(&mut self, a: usize, b: usize) {
        self.keys.swap(a, b);
        let swapped = self.values.swap_elements(a, b);
        debug_assert!(swapped.is_ok(), "value store out of step with keys");
    }
}

/// Sorted key/value map over a backing [`Node`].
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<K: ScalarValue, V: MapValue> {
    node: Node,
    storage: MapStorage,
    _types: PhantomData<(K, V)>,
}

impl<K: ScalarValue, V: MapValue> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ScalarValue, V: MapValue> OrderedMap<K, V> {
    fn pick_storage() -> MapStorage {
        if K::KIND == ScalarKind::Str {
            MapStorage::Named
        } else {
            MapStorage::Indexed
        }
    }

    /// Empty map; the backing node shape is fixed here from the key type.
    #[must_use]
    pub fn new() -> Self {
        let storage = Self::pick_storage();
        let node = match storage {
            MapStorage::Named => Node::parent(),
            MapStorage::Indexed => Node::List(vec![Node::array(K::KIND), V::empty_store()]),
        };
        OrderedMap {
            node,
            storage,
            _types: PhantomData,
        }
    }

    /// Adopt an existing node as map storage, validating its shape.
    ///
    /// Key order inside indexed storage is not re-checked; a node built by
    /// `push_back`-style appends needs [`OrderedMap::sort`] before lookups.
    pub fn from_node(node: Node) -> Result<Self> {
        let storage = Self::pick_storage();
        match storage {
            MapStorage::Named => {
                if node.kind() != Kind::Parent {
                    return Err(Error::UndefinedContainerType(node.kind().name()));
                }
            }
            MapStorage::Indexed => {
                if node.kind() != Kind::List || node.size() != 2 {
                    return Err(Error::UndefinedContainerType(node.kind().name()));
                }
                let keys = node.child(0).ok_or(Error::UndefinedContainerType("list"))?;
                let values = node.child(1).ok_or(Error::UndefinedContainerType("list"))?;
                match keys.array_kind() {
                    Some(kind) if kind == K::KIND => {}
                    Some(kind) => {
                        return Err(Error::TypeMismatch {
                            expected: K::KIND.name(),
                            found: kind.name(),
                        });
                    }
                    None => return Err(Error::UndefinedContainerType(keys.kind().name())),
                }
                V::check_store(values)?;
                if keys.size() != values.size() {
                    return Err(Error::UndefinedContainerType("unbalanced map stores"));
                }
            }
        }
        Ok(OrderedMap {
            node,
            storage,
            _types: PhantomData,
        })
    }

    /// Borrow the backing node, e.g. to hand it to the wire writer.
    #[must_use]
    pub fn as_node(&self) -> &Node {
        &self.node
    }

    /// Give up the backing node.
    #[must_use]
    pub fn into_node(self) -> Node {
        self.node
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self.storage {
            MapStorage::Named => self.node.size(),
            MapStorage::Indexed => self.stores().0.size(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn stores(&self) -> (&Node, &Node) {
        match &self.node {
            Node::List(children) if children.len() == 2 => (&children[0], &children[1]),
            _ => unreachable!("indexed map storage is a two-slot list"),
        }
    }

    fn stores_mut(&mut self) -> (&mut Node, &mut Node) {
        match &mut self.node {
            Node::List(children) if children.len() == 2 => {
                let (keys, values) = children.split_at_mut(1);
                (&mut keys[0], &mut values[0])
            }
            _ => unreachable!("indexed map storage is a two-slot list"),
        }
    }

    fn key_name(key: &K) -> Result<String> {
        String::from_scalar(&key.clone().into_scalar())
    }

    /// Key at `offset`, in physical order.
    pub fn key_at(&self, offset: usize) -> Result<K> {
        match self.storage {
            MapStorage::Indexed => self.stores().0.get(offset),
            MapStorage::Named => {
                let name = self.node.name_at(offset).ok_or(Error::IndexOutOfBounds {
                    index: offset,
                    len: self.len(),
                })?;
                K::from_scalar(&Scalar::Str(name.to_string()))
            }
        }
    }

    /// Value at `offset`, in physical order.
    pub fn value_at(&self, offset: usize) -> Result<V> {
        match self.storage {
            MapStorage::Indexed => V::read_at(self.stores().1, offset),
            MapStorage::Named => {
                let child = self.node.child(offset).ok_or(Error::IndexOutOfBounds {
                    index: offset,
                    len: self.len(),
                })?;
                V::from_node(child)
            }
        }
    }

    /// Offset of `key`, or `None` when absent.
    #[must_use]
    pub fn find(&self, key: &K) -> Option<usize> {
        match self.storage {
            MapStorage::Named => {
                let name = Self::key_name(key).ok()?;
                self.node.index_of_name(&name)
            }
            MapStorage::Indexed => {
                let keys = self.typed_keys().ok()?;
                let probe = KeySlice { keys };
                let (found, pos) = sort::binary_search(&probe, key, 0, keys.len());
                found.then_some(pos)
            }
        }
    }

    /// First offset whose key is not less than `key`.
    #[must_use]
    pub fn lower_bound(&self, key: &K) -> usize {
        match self.storage {
            MapStorage::Named => match Self::key_name(key).ok().and_then(|n| self.node.index_of_name(&n)) {
                Some(offset) => offset,
                None => self.len(),
            },
            MapStorage::Indexed => match self.typed_keys() {
                Ok(keys) => sort::lower_bound(&KeySlice { keys }, key, 0, keys.len()),
                Err(_) => self.len(),
            },
        }
    }

    /// First offset whose key is greater than `key`.
    #[must_use]
    pub fn upper_bound(&self, key: &K) -> usize {
        match self.storage {
            MapStorage::Named => {
                let mut offset = self.lower_bound(key);
                let name = match Self::key_name(key) {
                    Ok(name) => name,
                    Err(_) => return self.len(),
                };
                while self.node.name_at(offset) == Some(name.as_str()) {
                    offset += 1;
                }
                offset
            }
            MapStorage::Indexed => match self.typed_keys() {
                Ok(keys) => sort::upper_bound(&KeySlice { keys }, key, 0, keys.len()),
                Err(_) => self.len(),
            },
        }
    }

    /// Copy out the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        let offset = self.find(key)?;
        self.value_at(offset).ok()
    }

    /// Insert in unique-key mode, keeping keys ascending.
    ///
    /// Fails with [`Error::DuplicateKey`] and leaves the map untouched
    /// when `key` is already present.
    pub fn insert(&mut self, key: K, value: V) -> Result<()> {
        match self.storage {
            MapStorage::Named => {
                let name = Self::key_name(&key)?;
                if self.node.index_of_name(&name).is_some() {
                    return Err(Error::DuplicateKey);
                }
                self.node.add_named(name, value.into_node())
            }
            MapStorage::Indexed => {
                let len = self.len();
                let offset = self.lower_bound(&key);
                if offset < len && self.key_at(offset)?.compare(&key) == Ordering::Equal {
                    return Err(Error::DuplicateKey);
                }
                self.insert_pair_at(offset, key, value)
            }
        }
    }

    /// Insert allowing duplicates: the new entry lands after every equal
    /// key, so equal keys stay contiguous in insertion order.
    pub fn insert_dup(&mut self, key: K, value: V) -> Result<()> {
        match self.storage {
            MapStorage::Named => {
                let name = Self::key_name(&key)?;
                self.node.add_named(name, value.into_node())
            }
            MapStorage::Indexed => {
                let offset = self.upper_bound(&key);
                self.insert_pair_at(offset, key, value)
            }
        }
    }

    fn insert_pair_at(&mut self, offset: usize, key: K, value: V) -> Result<()> {
        let (keys, values) = self.stores_mut();
        keys.insert_item(offset, key)?;
        if let Err(err) = V::insert_at(values, offset, value) {
            // keep the stores in lock-step even on a failed value insert
            keys.erase_element(offset)?;
            return Err(err);
        }
        Ok(())
    }

    /// Remove the entry for `key`. Returns whether anything was removed.
    pub fn erase(&mut self, key: &K) -> Result<bool> {
        match self.find(key) {
            Some(offset) => {
                self.erase_at(offset)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove the entry at `offset` from both sides of the storage.
    pub fn erase_at(&mut self, offset: usize) -> Result<()> {
        let len = self.len();
        if offset >= len {
            return Err(Error::IndexOutOfBounds { index: offset, len });
        }
        match self.storage {
            MapStorage::Named => self.node.erase_element(offset),
            MapStorage::Indexed => {
                let (keys, values) = self.stores_mut();
                keys.erase_element(offset)?;
                values.erase_element(offset)
            }
        }
    }

    /// Append without maintaining key order. Lookups are undefined until
    /// [`OrderedMap::sort`] runs.
    pub fn push_back(&mut self, key: K, value: V) -> Result<()> {
        match self.storage {
            MapStorage::Named => {
                let name = Self::key_name(&key)?;
                self.node.add_named(name, value.into_node())
            }
            MapStorage::Indexed => {
                let offset = self.len();
                self.insert_pair_at(offset, key, value)
            }
        }
    }

    /// Re-establish ascending key order after bulk appends.
    ///
    /// Named storage keeps insertion order, so this is a no-op there.
    pub fn sort(&mut self) -> Result<()> {
        if self.storage == MapStorage::Named {
            return Ok(());
        }
        let entries = self.len();
        tracing::debug!(entries, "sorting map key/value stores");
        let (keys, values) = self.stores_mut();
        let key_slice = keys.scalars_mut::<K>()?;
        sort::sort(&mut PairAccess {
            keys: key_slice,
            values,
        });
        Ok(())
    }

    /// Visit every entry in physical order.
    pub fn for_each(&self, mut visit: impl FnMut(&K, &V)) -> Result<()> {
        for offset in 0..self.len() {
            let key = self.key_at(offset)?;
            let value = self.value_at(offset)?;
            visit(&key, &value);
        }
        Ok(())
    }

    /// Fold every entry in physical order into an accumulator.
    pub fn accumulate<A>(&self, init: A, mut fold: impl FnMut(A, &K, &V) -> A) -> Result<A> {
        let mut acc = init;
        for offset in 0..self.len() {
            let key = self.key_at(offset)?;
            let value = self.value_at(offset)?;
            acc = fold(acc, &key, &value);
        }
        Ok(acc)
    }

    /// Rewrite every value in place; keys are read-only.
    pub fn transform(&mut self, mut apply: impl FnMut(&K, V) -> V) -> Result<()> {
        for offset in 0..self.len() {
            let key = self.key_at(offset)?;
            let value = self.value_at(offset)?;
            let replacement = apply(&key, value);
            match self.storage {
                MapStorage::Indexed => {
                    let (_, values) = self.stores_mut();
                    V::write_at(values, offset, replacement)?;
                }
                MapStorage::Named => {
                    let len = self.len();
                    let child = self.node.child_mut(offset).ok_or(Error::IndexOutOfBounds {
                        index: offset,
                        len,
                    })?;
                    *child = replacement.into_node();
                }
            }
        }
        Ok(())
    }

    fn typed_keys(&self) -> Result<&[K]> {
        self.stores().0.scalars::<K>()
    }
}
