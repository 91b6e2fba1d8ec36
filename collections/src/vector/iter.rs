use std::{iter::FusedIterator, sync::Arc};

use crate::config::MASK;

use super::{node::Node, Vector};

/// Iterates over a vector one leaf at a time.
///
/// Looking up a leaf costs a walk down the trie, but that happens only once
/// per 32 elements.
#[derive(Debug)]
pub struct Iter<'a, T> {
    vec: &'a Vector<T>,
    // Index of the first element after `leaf`.
    next: usize,
    leaf: std::slice::Iter<'a, T>,
}

impl<'a, T> Iter<'a, T> {
    pub(super) fn new(vec: &'a Vector<T>, start: usize) -> Self {
        Iter {
            vec,
            next: start,
            leaf: [].iter(),
        }
    }
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Iter {
            vec: self.vec,
            next: self.next,
            leaf: self.leaf.clone(),
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(ret) = self.leaf.next() {
                return Some(ret);
            }
            let leaf = self.vec.leaf_for(self.next)?;
            let elems = &leaf.elems()[(self.next & MASK)..];
            self.next += elems.len();
            self.leaf = elems.iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.leaf.len() + (self.vec.len() - self.next);
        (len, Some(len))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

/// An immutable cursor into a vector.
///
/// A `ChunkedSeq` points at one element and knows the leaf ("chunk") that
/// element lives in. Moving forward within a chunk is free; moving to the
/// next chunk walks the trie once. Cursors are values: advancing returns a
/// new cursor, and any cursor can be kept around and resumed from later.
#[derive(Debug)]
pub struct ChunkedSeq<T> {
    vec: Vector<T>,
    leaf: Arc<Node<T>>,
    // Index of `leaf[0]` in `vec`.
    base: usize,
    offset: usize,
}

impl<T> Clone for ChunkedSeq<T> {
    fn clone(&self) -> Self {
        ChunkedSeq {
            vec: self.vec.clone(),
            leaf: Arc::clone(&self.leaf),
            base: self.base,
            offset: self.offset,
        }
    }
}

impl<T> ChunkedSeq<T> {
    pub(super) fn at(vec: Vector<T>, index: usize) -> Option<Self> {
        let leaf = Arc::clone(vec.leaf_for(index)?);
        Some(ChunkedSeq {
            vec,
            leaf,
            base: index & !MASK,
            offset: index & MASK,
        })
    }

    pub fn first(&self) -> &T {
        &self.leaf.elems()[self.offset]
    }

    /// The cursor one element further, or `None` at the end of the vector.
    pub fn rest(&self) -> Option<Self> {
        if self.offset + 1 < self.leaf.elems().len() {
            Some(ChunkedSeq {
                offset: self.offset + 1,
                ..self.clone()
            })
        } else {
            self.next_chunk()
        }
    }

    /// The elements from the cursor to the end of its chunk.
    pub fn chunk(&self) -> &[T] {
        &self.leaf.elems()[self.offset..]
    }

    /// A cursor at the start of the next chunk.
    pub fn next_chunk(&self) -> Option<Self> {
        ChunkedSeq::at(self.vec.clone(), self.base + self.leaf.elems().len())
    }

    /// Position of the cursor in the underlying vector.
    pub fn index(&self) -> usize {
        self.base + self.offset
    }

    /// Number of elements from the cursor to the end, the cursor included.
    pub fn len(&self) -> usize {
        self.vec.len() - self.index()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// An owning iterator, cloning elements out of shared leaves.
pub struct IntoIter<T> {
    seq: Option<ChunkedSeq<T>>,
}

impl<T> IntoIter<T> {
    pub(super) fn new(seq: Option<ChunkedSeq<T>>) -> Self {
        IntoIter { seq }
    }
}

impl<T: Clone> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        let seq = self.seq.take()?;
        let ret = seq.first().clone();
        self.seq = seq.rest();
        Some(ret)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.seq.as_ref().map_or(0, ChunkedSeq::len);
        (len, Some(len))
    }
}

impl<T: Clone> ExactSizeIterator for IntoIter<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iter_starting_at() {
        let vec: Vector<u32> = (0..100).collect();
        for start in [0, 1, 31, 32, 33, 95, 96, 99, 100] {
            let iter = vec.iter_starting_at(start);
            assert_eq!(iter.len(), 100 - start);
            assert_eq!(
                iter.copied().collect::<Vec<_>>(),
                (start as u32..100).collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn seq_walks_chunks() {
        let vec: Vector<u32> = (0..70).collect();
        let seq = vec.seq().unwrap();
        assert_eq!(*seq.first(), 0);
        assert_eq!(seq.chunk().len(), 32);
        assert_eq!(seq.len(), 70);

        let second = seq.next_chunk().unwrap();
        assert_eq!(second.index(), 32);
        assert_eq!(second.chunk(), (32..64).collect::<Vec<_>>().as_slice());

        let tail = second.next_chunk().unwrap();
        assert_eq!(tail.chunk(), &[64, 65, 66, 67, 68, 69]);
        assert!(tail.next_chunk().is_none());
        assert!(Vector::<u32>::new().seq().is_none());
    }

    #[test]
    fn seq_is_restartable() {
        let vec: Vector<u32> = (0..40).collect();
        let mut seq = vec.seq().unwrap();
        for _ in 0..30 {
            seq = seq.rest().unwrap();
        }
        let saved = seq.clone();

        let mut rest = Vec::new();
        let mut cursor = Some(seq);
        while let Some(s) = cursor {
            rest.push(*s.first());
            cursor = s.rest();
        }
        assert_eq!(rest, (30..40).collect::<Vec<_>>());

        // Resuming from the saved cursor replays the same elements.
        assert_eq!(*saved.first(), 30);
        assert_eq!(saved.len(), 10);
        assert_eq!(*saved.rest().unwrap().rest().unwrap().first(), 32);
    }

    #[test]
    fn seq_survives_later_edits() {
        let vec: Vector<u32> = (0..40).collect();
        let seq = vec.seq().unwrap();
        let edited = vec.assoc_n(0, 100).unwrap().conj(40);
        assert_eq!(*seq.first(), 0);
        assert_eq!(seq.len(), 40);
        assert_eq!(edited[0], 100);
    }

    #[test]
    fn into_iter_size() {
        let vec: Vector<u32> = (0..50).collect();
        let mut iter = vec.into_iter();
        assert_eq!(iter.len(), 50);
        iter.next();
        assert_eq!(iter.len(), 49);
        assert_eq!(iter.sum::<u32>(), (1..50).sum::<u32>());
    }
}
