//! A persistent hash map, implemented as a hash array mapped trie (HAMT).
//!
//! Keys are placed in the trie according to their [`Equiv::hash_code`], five
//! bits per level. Each node keeps two bitmaps, one for the fragments where it
//! stores an entry inline and one for the fragments where it has a child,
//! and stores only the occupied slots. Keys whose hashes agree on all 32 bits
//! share a collision node at the bottom of the trie.
//!
//! The trie is kept in a canonical shape: a node other than the root never
//! holds just one entry, since that entry can be stored inline in its parent.

use std::{borrow::Borrow, fmt, marker::PhantomData, sync::Arc};

use crate::{
    error::{Error, Result},
    hash::{hash_ordered, hash_unordered, Equiv},
    token::Token,
    vector::Vector,
};

mod iter;
mod node;
mod transient;

pub use iter::{Iter, Keys, MapSeq, Values};
pub use transient::TransientMap;

use node::Node;

pub struct Map<K, V> {
    count: usize,
    // `None` is the canonical empty map.
    root: Option<Arc<Node<K, V>>>,
}

impl<K, V> Map<K, V> {
    /// The empty map. This doesn't allocate.
    pub fn new() -> Self {
        Map {
            count: 0,
            root: None,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.root.as_deref(), self.count)
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys(self.iter())
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values(self.iter())
    }

    /// An immutable cursor over the entries, or `None` if the map is empty.
    pub fn seq(&self) -> Option<MapSeq<K, V>> {
        MapSeq::new(self.root.clone(), self.count)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Equiv + ?Sized,
    {
        self.get_key_value(key).map(|(_, v)| v)
    }

    /// The stored key equivalent to `key`, with its value.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Equiv + ?Sized,
    {
        self.root
            .as_ref()
            .and_then(|root| root.find(0, key.hash_code(), key))
    }

    pub fn get_or<'a, Q>(&'a self, key: &Q, default: &'a V) -> &'a V
    where
        K: Borrow<Q>,
        Q: Equiv + ?Sized,
    {
        self.get(key).unwrap_or(default)
    }

    /// Like [`get`](Self::get), but fails with [`Error::MissingKey`].
    pub fn fetch<Q>(&self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: Equiv + ?Sized,
    {
        self.get(key).ok_or(Error::MissingKey)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Equiv + ?Sized,
    {
        self.get_key_value(key).is_some()
    }
}

impl<K: Equiv + Clone, V: Clone> Map<K, V> {
    /// Starts a transient session from this map.
    pub fn transient(&self) -> TransientMap<K, V> {
        TransientMap::new(self.clone())
    }

    /// Returns a map where `key` is bound to `value`.
    pub fn assoc(&self, key: K, value: V) -> Self {
        let mut ret = self.clone();
        ret.assoc_mut(None, key, value);
        ret
    }

    /// Like [`assoc`](Self::assoc), but fails with [`Error::DuplicateKey`] if
    /// the key is already bound.
    pub fn assoc_new(&self, key: K, value: V) -> Result<Self> {
        if self.contains_key(&key) {
            return Err(Error::DuplicateKey);
        }
        Ok(self.assoc(key, value))
    }

    /// Returns a map without `key`. If `key` isn't bound, this is a clone of
    /// `self` sharing all its nodes.
    pub fn dissoc<Q>(&self, key: &Q) -> Self
    where
        K: Borrow<Q>,
        Q: Equiv + ?Sized,
    {
        let mut ret = self.clone();
        ret.dissoc_mut(None, key);
        ret
    }

    // Like the vector's `*_mut` methods, these serve both persistent edits
    // (`edit == None`) and transient ones.

    /// Returns true if the key is new.
    pub(crate) fn assoc_mut(&mut self, edit: Option<&Token>, key: K, value: V) -> bool {
        let hash = key.hash_code();
        let mut added = false;
        match &mut self.root {
            Some(root) => Node::assoc(root, edit, 0, hash, key, value, &mut added),
            None => {
                self.root = Some(Arc::new(Node::singleton(edit, hash, key, value)));
                added = true;
            }
        }
        if added {
            self.count += 1;
        }
        added
    }

    /// Returns true if the key was there.
    pub(crate) fn dissoc_mut<Q>(&mut self, edit: Option<&Token>, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Equiv + ?Sized,
    {
        let hash = key.hash_code();
        let Some(root) = &mut self.root else {
            return false;
        };
        if root.find(0, hash, key).is_none() {
            return false;
        }

        let mut removed = false;
        Node::without(root, edit, 0, hash, key, &mut removed);
        debug_assert!(removed);
        self.count -= 1;
        if self.count == 0 {
            self.root = None;
        }
        true
    }
}

impl<T: Equiv + Clone> Map<T, T> {
    /// Builds a map from alternating keys and values.
    ///
    /// Later bindings of a key win. A trailing key without a value is an
    /// [`Error::InvalidPairShape`].
    pub fn from_flat_pairs<I: IntoIterator<Item = T>>(items: I) -> Result<Self> {
        Map::build_from_flat(items, false)
    }

    /// Like [`from_flat_pairs`](Self::from_flat_pairs), but a key appearing
    /// twice is an [`Error::DuplicateKey`].
    pub fn from_flat_pairs_checked<I: IntoIterator<Item = T>>(items: I) -> Result<Self> {
        Map::build_from_flat(items, true)
    }

    fn build_from_flat<I: IntoIterator<Item = T>>(items: I, checked: bool) -> Result<Self> {
        let mut transient = Map::new().transient();
        let mut items = items.into_iter();
        while let Some(key) = items.next() {
            let value = items.next().ok_or(Error::InvalidPairShape { len: 1 })?;
            if checked {
                transient.assoc_new(key, value)?;
            } else {
                transient.assoc(key, value)?;
            }
        }
        transient.finalize()
    }

    /// Builds a map from two-element vectors, each holding a key then a value.
    pub fn try_from_entries<I: IntoIterator<Item = Vector<T>>>(entries: I) -> Result<Self> {
        let mut transient = Map::new().transient();
        for entry in entries {
            let (Some(key), Some(value), 2) = (entry.get(0), entry.get(1), entry.len()) else {
                return Err(Error::InvalidPairShape { len: entry.len() });
            };
            transient.assoc(key.clone(), value.clone())?;
        }
        transient.finalize()
    }
}

impl<K, V> Default for Map<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for Map<K, V> {
    fn clone(&self) -> Self {
        Map {
            count: self.count,
            root: self.root.clone(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Map<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Equiv, V: PartialEq> PartialEq for Map<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.count == other.count && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K: Equiv, V: Eq> Eq for Map<K, V> {}

impl<K: Equiv, V: Equiv> Equiv for Map<K, V> {
    fn hash_code(&self) -> u32 {
        hash_unordered(
            self.iter()
                .map(|(k, v)| hash_ordered([k.hash_code(), v.hash_code()])),
        )
    }

    fn equiv(&self, other: &Self) -> bool {
        self.count == other.count
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|w| v.equiv(w)))
    }
}

impl<K: Equiv + Clone, V: Clone> FromIterator<(K, V)> for Map<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut ret = Map::new();
        ret.extend(iter);
        ret
    }
}

impl<K: Equiv + Clone, V: Clone> Extend<(K, V)> for Map<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let token = Token::new();
        for (k, v) in iter {
            self.assoc_mut(Some(&token), k, v);
        }
        let _ = token.invalidate();
    }
}

impl<'a, K, V> IntoIterator for &'a Map<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: serde::Serialize, V: serde::Serialize> serde::Serialize for Map<K, V> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct MapVisitor<K, V>(PhantomData<fn() -> Map<K, V>>);

impl<'de, K, V> serde::de::Visitor<'de> for MapVisitor<K, V>
where
    K: Equiv + Clone + serde::Deserialize<'de>,
    V: Clone + serde::Deserialize<'de>,
{
    type Value = Map<K, V>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut ret = Map::new();
        let token = Token::new();
        while let Some((k, v)) = access.next_entry()? {
            ret.assoc_mut(Some(&token), k, v);
        }
        let _ = token.invalidate();
        Ok(ret)
    }
}

impl<'de, K, V> serde::Deserialize<'de> for Map<K, V>
where
    K: Equiv + Clone + serde::Deserialize<'de>,
    V: Clone + serde::Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(MapVisitor(PhantomData))
    }
}
