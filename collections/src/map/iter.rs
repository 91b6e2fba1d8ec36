use std::{iter::FusedIterator, sync::Arc};

use smallvec::SmallVec;

use crate::config::MAX_MAP_DEPTH;

use super::node::{Node, NodeRef};

/// One level of a traversal: the node, the next entry to yield from it and
/// the next child to descend into.
#[derive(Clone, Debug)]
struct Frame<N> {
    node: N,
    entry: usize,
    child: usize,
}

impl<N> Frame<N> {
    fn new(node: N) -> Self {
        Frame {
            node,
            entry: 0,
            child: 0,
        }
    }
}

type Stack<N> = SmallVec<[Frame<N>; MAX_MAP_DEPTH]>;

/// Advances `stack` until its top frame points at an entry. A node's own
/// entries come before those of its children.
///
/// Returns false once the traversal is exhausted, in which case the stack is
/// empty.
fn settle<K, V, N: NodeRef<K, V>>(stack: &mut Stack<N>) -> bool {
    while let Some(top) = stack.last_mut() {
        if top.entry < top.node.entry_count() {
            return true;
        }
        if top.child < top.node.child_count() {
            let child = top.node.child(top.child);
            top.child += 1;
            stack.push(Frame::new(child));
        } else {
            stack.pop();
        }
    }
    false
}

fn start<K, V, N: NodeRef<K, V>>(root: Option<N>) -> Stack<N> {
    let mut stack = Stack::new();
    if let Some(root) = root {
        stack.push(Frame::new(root));
        settle(&mut stack);
    }
    stack
}

/// Iterates over the entries of a map.
#[derive(Debug)]
pub struct Iter<'a, K, V> {
    stack: Stack<&'a Node<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(super) fn new(root: Option<&'a Node<K, V>>, len: usize) -> Self {
        Iter {
            stack: start(root),
            remaining: len,
        }
    }
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            stack: self.stack.clone(),
            remaining: self.remaining,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if !settle(&mut self.stack) {
            return None;
        }
        let top = self.stack.last_mut()?;
        let node: &'a Node<K, V> = top.node;
        let ret = node.entry_at(top.entry);
        top.entry += 1;
        self.remaining -= 1;
        Some(ret)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// An immutable cursor over the entries of a map.
///
/// The cursor owns its path from the root, so it stays valid whatever happens
/// to the map it came from. Advancing returns a new cursor; keeping an old
/// one around lets a traversal be resumed from there.
#[derive(Debug)]
pub struct MapSeq<K, V> {
    stack: Stack<Arc<Node<K, V>>>,
    remaining: usize,
}

impl<K, V> Clone for MapSeq<K, V> {
    fn clone(&self) -> Self {
        MapSeq {
            stack: self.stack.clone(),
            remaining: self.remaining,
        }
    }
}

impl<K, V> MapSeq<K, V> {
    pub(super) fn new(root: Option<Arc<Node<K, V>>>, len: usize) -> Option<Self> {
        let stack = start(root);
        (!stack.is_empty()).then_some(MapSeq {
            stack,
            remaining: len,
        })
    }

    pub fn first(&self) -> (&K, &V) {
        let top = self.stack.last().expect("a map seq is never exhausted");
        top.node.entry_at(top.entry)
    }

    /// The cursor at the next entry, or `None` after the last one.
    pub fn rest(&self) -> Option<Self> {
        let mut stack = self.stack.clone();
        stack.last_mut()?.entry += 1;
        settle(&mut stack).then_some(MapSeq {
            stack,
            remaining: self.remaining - 1,
        })
    }

    /// Number of entries from the cursor to the end, the cursor included.
    pub fn len(&self) -> usize {
        self.remaining
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Iterates over the keys of a map.
#[derive(Clone, Debug)]
pub struct Keys<'a, K, V>(pub(super) Iter<'a, K, V>);

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

/// Iterates over the values of a map.
#[derive(Clone, Debug)]
pub struct Values<'a, K, V>(pub(super) Iter<'a, K, V>);

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}
