use std::{borrow::Borrow, ops::Deref, sync::Arc};

use crate::{
    config::{BITS, MASK, MAX_SHIFT},
    hash::Equiv,
    metrics::increment,
    token::{owns, Token},
};

/// The bit standing for `hash`'s fragment at `shift` in a node's bitmaps.
fn bitpos(hash: u32, shift: u32) -> u32 {
    1 << ((hash >> shift) as usize & MASK)
}

/// Number of bits of `bitmap` below `bit`.
fn rank(bitmap: u32, bit: u32) -> usize {
    (bitmap & (bit - 1)).count_ones() as usize
}

#[derive(Clone, Debug)]
pub(crate) enum Slot<K, V> {
    Entry(K, V),
    Child(Arc<Node<K, V>>),
}

/// A node that discriminates on five bits of the hash.
///
/// `data_map` marks the fragments holding an inline entry, `node_map` those
/// holding a child node; they never overlap. `slots` has one slot per set
/// bit: entries come first, in increasing bit order, and children fill the
/// array from the other end, so that the child with the lowest bit is last.
#[derive(Clone, Debug)]
pub(crate) struct BitmapNode<K, V> {
    stamp: Option<Token>,
    data_map: u32,
    node_map: u32,
    slots: Vec<Slot<K, V>>,
}

/// Entries whose keys share all 32 bits of their hash.
#[derive(Clone, Debug)]
pub(crate) struct CollisionNode<K, V> {
    stamp: Option<Token>,
    hash: u32,
    entries: Vec<(K, V)>,
}

#[derive(Clone, Debug)]
pub(crate) enum Node<K, V> {
    Bitmap(BitmapNode<K, V>),
    Collision(CollisionNode<K, V>),
}

impl<K, V> BitmapNode<K, V> {
    fn data_index(&self, bit: u32) -> usize {
        rank(self.data_map, bit)
    }

    fn node_index(&self, bit: u32) -> usize {
        self.slots.len() - 1 - rank(self.node_map, bit)
    }

    fn entry(&self, index: usize) -> (&K, &V) {
        let Slot::Entry(k, v) = &self.slots[index] else {
            unreachable!("expected an entry slot");
        };
        (k, v)
    }

    fn child_mut(&mut self, index: usize) -> &mut Arc<Node<K, V>> {
        let Slot::Child(child) = &mut self.slots[index] else {
            unreachable!("expected a child slot");
        };
        child
    }

    fn insert_entry(&mut self, bit: u32, key: K, value: V) {
        let index = self.data_index(bit);
        self.slots.insert(index, Slot::Entry(key, value));
        self.data_map |= bit;
    }

    fn remove_entry(&mut self, bit: u32) -> (K, V) {
        let index = self.data_index(bit);
        self.data_map ^= bit;
        let Slot::Entry(k, v) = self.slots.remove(index) else {
            unreachable!("expected an entry slot");
        };
        (k, v)
    }

    fn insert_child(&mut self, bit: u32, child: Arc<Node<K, V>>) {
        // The new child ends up at `len - 1 - rank` once the slots grew by one.
        let index = self.slots.len() - rank(self.node_map, bit);
        self.slots.insert(index, Slot::Child(child));
        self.node_map |= bit;
    }

    fn remove_child(&mut self, bit: u32) -> Arc<Node<K, V>> {
        let index = self.node_index(bit);
        self.node_map ^= bit;
        let Slot::Child(child) = self.slots.remove(index) else {
            unreachable!("expected a child slot");
        };
        child
    }
}

impl<K: Equiv + Clone, V: Clone> BitmapNode<K, V> {
    fn assoc(
        &mut self,
        edit: Option<&Token>,
        shift: u32,
        hash: u32,
        key: K,
        value: V,
        added: &mut bool,
    ) {
        let bit = bitpos(hash, shift);
        if self.data_map & bit != 0 {
            let index = self.data_index(bit);
            if let Slot::Entry(k, v) = &mut self.slots[index] {
                if k.equiv(&key) {
                    *v = value;
                    return;
                }
            }
            // Two different keys on the same fragment: push both one level down.
            let (old_key, old_value) = self.remove_entry(bit);
            let old_hash = old_key.hash_code();
            let child = Node::merge(
                edit,
                shift + BITS,
                (old_hash, old_key, old_value),
                (hash, key, value),
            );
            self.insert_child(bit, Arc::new(child));
            *added = true;
        } else if self.node_map & bit != 0 {
            let index = self.node_index(bit);
            Node::assoc(self.child_mut(index), edit, shift + BITS, hash, key, value, added);
        } else {
            self.insert_entry(bit, key, value);
            *added = true;
        }
    }

    fn without<Q>(&mut self, edit: Option<&Token>, shift: u32, hash: u32, key: &Q, removed: &mut bool)
    where
        K: Borrow<Q>,
        Q: Equiv + ?Sized,
    {
        let bit = bitpos(hash, shift);
        if self.data_map & bit != 0 {
            let (k, _) = self.entry(self.data_index(bit));
            if key.equiv(k.borrow()) {
                self.remove_entry(bit);
                *removed = true;
            }
        } else if self.node_map & bit != 0 {
            let index = self.node_index(bit);
            let child = self.child_mut(index);
            Node::without(child, edit, shift + BITS, hash, key, removed);
            if child.is_single_entry() {
                // A lone entry doesn't deserve its own node: pull it up here.
                let child = self.remove_child(bit);
                let (k, v) = Arc::unwrap_or_clone(child).into_single_entry();
                self.insert_entry(bit, k, v);
            }
        }
    }
}

impl<K: Equiv + Clone, V: Clone> CollisionNode<K, V> {
    fn assoc(&mut self, hash: u32, key: K, value: V, added: &mut bool) {
        debug_assert_eq!(hash, self.hash);
        match self.entries.iter_mut().find(|(k, _)| k.equiv(&key)) {
            Some((_, v)) => *v = value,
            None => {
                self.entries.push((key, value));
                *added = true;
            }
        }
    }

    fn without<Q>(&mut self, key: &Q, removed: &mut bool)
    where
        K: Borrow<Q>,
        Q: Equiv + ?Sized,
    {
        if let Some(pos) = self.entries.iter().position(|(k, _)| key.equiv(k.borrow())) {
            self.entries.remove(pos);
            *removed = true;
        }
    }
}

impl<K, V> Node<K, V> {
    /// A root node holding one entry.
    pub(crate) fn singleton(edit: Option<&Token>, hash: u32, key: K, value: V) -> Self {
        Node::Bitmap(BitmapNode {
            stamp: edit.cloned(),
            data_map: bitpos(hash, 0),
            node_map: 0,
            slots: vec![Slot::Entry(key, value)],
        })
    }

    fn stamp(&self) -> Option<&Token> {
        match self {
            Node::Bitmap(b) => b.stamp.as_ref(),
            Node::Collision(c) => c.stamp.as_ref(),
        }
    }

    /// Number of entries stored directly in this node.
    pub(crate) fn entry_count(&self) -> usize {
        match self {
            Node::Bitmap(b) => b.data_map.count_ones() as usize,
            Node::Collision(c) => c.entries.len(),
        }
    }

    pub(crate) fn entry_at(&self, index: usize) -> (&K, &V) {
        match self {
            Node::Bitmap(b) => b.entry(index),
            Node::Collision(c) => {
                let (k, v) = &c.entries[index];
                (k, v)
            }
        }
    }

    pub(crate) fn child_count(&self) -> usize {
        match self {
            Node::Bitmap(b) => b.node_map.count_ones() as usize,
            Node::Collision(_) => 0,
        }
    }

    /// The `index`-th child in bit order.
    pub(crate) fn child_at(&self, index: usize) -> &Arc<Self> {
        let Node::Bitmap(b) = self else {
            unreachable!("collision nodes have no children");
        };
        let Slot::Child(child) = &b.slots[b.slots.len() - 1 - index] else {
            unreachable!("expected a child slot");
        };
        child
    }

    fn is_single_entry(&self) -> bool {
        match self {
            Node::Bitmap(b) => b.node_map == 0 && b.slots.len() == 1,
            Node::Collision(c) => c.entries.len() == 1,
        }
    }

    fn into_single_entry(self) -> (K, V) {
        let entry = match self {
            Node::Bitmap(b) => b.slots.into_iter().next().and_then(|slot| match slot {
                Slot::Entry(k, v) => Some((k, v)),
                Slot::Child(_) => None,
            }),
            Node::Collision(c) => c.entries.into_iter().next(),
        };
        entry.expect("node holds a single entry")
    }

    /// Looks `key` up below this node, which sits at `shift`.
    pub(crate) fn find<Q>(&self, shift: u32, hash: u32, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Equiv + ?Sized,
    {
        let mut node = self;
        let mut shift = shift;
        loop {
            match node {
                Node::Bitmap(b) => {
                    let bit = bitpos(hash, shift);
                    if b.data_map & bit != 0 {
                        let (k, v) = b.entry(b.data_index(bit));
                        return key.equiv(k.borrow()).then_some((k, v));
                    } else if b.node_map & bit != 0 {
                        let Slot::Child(child) = &b.slots[b.node_index(bit)] else {
                            unreachable!("expected a child slot");
                        };
                        node = &**child;
                        shift += BITS;
                    } else {
                        return None;
                    }
                }
                Node::Collision(c) => {
                    if c.hash != hash {
                        return None;
                    }
                    return c
                        .entries
                        .iter()
                        .find(|(k, _)| key.equiv(k.borrow()))
                        .map(|(k, v)| (k, v));
                }
            }
        }
    }
}

impl<K: Equiv + Clone, V: Clone> Node<K, V> {
    /// Gives write access to `node`, copying it unless the session `edit`
    /// stamped it and holds the only reference.
    fn editable<'a>(node: &'a mut Arc<Self>, edit: Option<&Token>) -> &'a mut Self {
        if owns(edit, node.stamp()) && Arc::get_mut(node).is_some() {
            increment!("map.node_edited_in_place");
        } else {
            increment!("map.node_copied");
            let mut copy = Node::clone(&**node);
            match &mut copy {
                Node::Bitmap(b) => b.stamp = edit.cloned(),
                Node::Collision(c) => c.stamp = edit.cloned(),
            }
            *node = Arc::new(copy);
        }
        Arc::get_mut(node).expect("node was just made unique")
    }

    /// Inserts or replaces `key` below `node`, which sits at `shift`. Sets
    /// `added` if the map grew.
    pub(crate) fn assoc(
        node: &mut Arc<Self>,
        edit: Option<&Token>,
        shift: u32,
        hash: u32,
        key: K,
        value: V,
        added: &mut bool,
    ) {
        match Node::editable(node, edit) {
            Node::Bitmap(b) => b.assoc(edit, shift, hash, key, value, added),
            Node::Collision(c) => c.assoc(hash, key, value, added),
        }
    }

    /// Removes `key` from below `node`, which sits at `shift`. Sets `removed`
    /// if the key was there.
    ///
    /// This copies the path to where the key would be even if it is missing,
    /// so callers should check for the key first.
    pub(crate) fn without<Q>(
        node: &mut Arc<Self>,
        edit: Option<&Token>,
        shift: u32,
        hash: u32,
        key: &Q,
        removed: &mut bool,
    ) where
        K: Borrow<Q>,
        Q: Equiv + ?Sized,
    {
        match Node::editable(node, edit) {
            Node::Bitmap(b) => b.without(edit, shift, hash, key, removed),
            Node::Collision(c) => c.without(key, removed),
        }
    }

    /// A node at `shift` holding two entries with different keys.
    fn merge(edit: Option<&Token>, shift: u32, a: (u32, K, V), b: (u32, K, V)) -> Self {
        let (hash_a, key_a, value_a) = a;
        let (hash_b, key_b, value_b) = b;

        if shift > MAX_SHIFT {
            debug_assert_eq!(hash_a, hash_b);
            log::trace!("hash collision on {hash_a:#010x}");
            return Node::Collision(CollisionNode {
                stamp: edit.cloned(),
                hash: hash_a,
                entries: vec![(key_a, value_a), (key_b, value_b)],
            });
        }

        let bit_a = bitpos(hash_a, shift);
        let bit_b = bitpos(hash_b, shift);
        if bit_a == bit_b {
            let child = Node::merge(
                edit,
                shift + BITS,
                (hash_a, key_a, value_a),
                (hash_b, key_b, value_b),
            );
            Node::Bitmap(BitmapNode {
                stamp: edit.cloned(),
                data_map: 0,
                node_map: bit_a,
                slots: vec![Slot::Child(Arc::new(child))],
            })
        } else {
            let slot_a = Slot::Entry(key_a, value_a);
            let slot_b = Slot::Entry(key_b, value_b);
            let slots = if bit_a < bit_b {
                vec![slot_a, slot_b]
            } else {
                vec![slot_b, slot_a]
            };
            Node::Bitmap(BitmapNode {
                stamp: edit.cloned(),
                data_map: bit_a | bit_b,
                node_map: 0,
                slots,
            })
        }
    }
}

/// A handle to a node that a traversal can hold on to: either a plain
/// reference, for borrowing iterators, or an `Arc`, for cursors that own
/// their path.
pub(crate) trait NodeRef<K, V>: Deref<Target = Node<K, V>> + Sized {
    fn child(&self, index: usize) -> Self;
}

impl<K, V> NodeRef<K, V> for &Node<K, V> {
    fn child(&self, index: usize) -> Self {
        (*self).child_at(index)
    }
}

impl<K, V> NodeRef<K, V> for Arc<Node<K, V>> {
    fn child(&self, index: usize) -> Self {
        Arc::clone(self.child_at(index))
    }
}
