//! A persistent vector, also known as a bitmapped vector trie.
//!
//! Elements live in 32-wide leaves hanging from a trie of 32-wide branches,
//! except for the last (up to) 32 elements, which are kept in a separate
//! *tail* leaf. Appending and popping mostly touch the tail only; when the
//! tail fills up it is pushed into the trie as a whole leaf.
//!
//! Every modification returns a new vector and leaves the old one intact.
//! The two share every node the modification didn't touch.

use std::{fmt, ops::Index, sync::Arc};

use imbl_sized_chunks::Chunk;

use crate::{
    config::{BITS, MASK, WIDTH},
    error::{Error, Result},
    hash::{hash_ordered, Equiv},
    token::Token,
};

mod iter;
mod node;
mod transient;

pub use iter::{ChunkedSeq, IntoIter, Iter};
pub use transient::TransientVector;

use node::Node;

pub struct Vector<T> {
    count: usize,
    // Bit offset of the root's child index, a multiple of `BITS`. The leaves
    // sit at shift zero.
    shift: u32,
    // `None` is the canonical empty trie. It goes with `shift == BITS`.
    root: Option<Arc<Node<T>>>,
    // Always a leaf, and `None` exactly when the vector is empty.
    tail: Option<Arc<Node<T>>>,
}

impl<T> Vector<T> {
    /// The empty vector. This doesn't allocate.
    pub fn new() -> Self {
        Vector {
            count: 0,
            shift: BITS,
            root: None,
            tail: None,
        }
    }

    /// A vector containing exactly `value`.
    pub fn unit(value: T) -> Self {
        Vector {
            count: 1,
            shift: BITS,
            root: None,
            tail: Some(Arc::new(Node::leaf(None, Chunk::unit(value)))),
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of branch levels in the trie: zero while every element fits in
    /// the tail, one from 33 elements on, two from 1057 on, and so on.
    pub fn height(&self) -> u32 {
        if self.root.is_some() {
            self.shift / BITS
        } else {
            0
        }
    }

    /// Index of the first element held by the tail.
    fn tail_offset(&self) -> usize {
        if self.count < WIDTH {
            0
        } else {
            ((self.count - 1) >> BITS) << BITS
        }
    }

    /// The leaf holding `index`, which is the tail for the last few indices.
    fn leaf_for(&self, index: usize) -> Option<&Arc<Node<T>>> {
        if index >= self.count {
            return None;
        }
        if index >= self.tail_offset() {
            return self.tail.as_ref();
        }

        let mut node = self.root.as_ref()?;
        let mut level = self.shift;
        while level > 0 {
            node = node.children().get((index >> level) & MASK)?;
            level -= BITS;
        }
        Some(node)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.leaf_for(index)
            .and_then(|leaf| leaf.elems().get(index & MASK))
    }

    /// Like [`get`](Self::get), but fails with [`Error::OutOfRange`].
    pub fn nth(&self, index: usize) -> Result<&T> {
        self.get(index).ok_or(Error::OutOfRange {
            index,
            len: self.count,
        })
    }

    pub fn nth_or<'a>(&'a self, index: usize, default: &'a T) -> &'a T {
        self.get(index).unwrap_or(default)
    }

    /// The last element.
    pub fn peek(&self) -> Option<&T> {
        self.count.checked_sub(1).and_then(|last| self.get(last))
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self, 0)
    }

    /// An immutable cursor over the elements, or `None` if the vector is empty.
    pub fn seq(&self) -> Option<ChunkedSeq<T>> {
        ChunkedSeq::at(self.clone(), 0)
    }

    /// Iterates over the elements from `index` on.
    ///
    /// Panics if `index` is larger than the length.
    pub fn iter_starting_at(&self, index: usize) -> Iter<'_, T> {
        if index > self.count {
            panic!("out of bounds");
        }
        Iter::new(self, index)
    }
}

impl<T: Clone> Vector<T> {
    /// Starts a transient session from this vector.
    pub fn transient(&self) -> TransientVector<T> {
        TransientVector::new(self.clone())
    }

    /// Returns a vector with `value` appended.
    pub fn conj(&self, value: T) -> Self {
        let mut ret = self.clone();
        ret.conj_mut(None, value);
        ret
    }

    /// Returns a vector with the element at `index` replaced by `value`.
    ///
    /// `index` may be equal to the length, in which case this is
    /// [`conj`](Self::conj).
    pub fn assoc_n(&self, index: usize, value: T) -> Result<Self> {
        let mut ret = self.clone();
        ret.assoc_n_mut(None, index, value)?;
        Ok(ret)
    }

    /// Returns a vector without its last element.
    pub fn pop(&self) -> Result<Self> {
        let mut ret = self.clone();
        ret.pop_mut(None)?;
        Ok(ret)
    }

    // The `*_mut` methods implement both persistent and transient edits. A
    // persistent edit runs them on a clone with `edit == None`, which copies
    // every node it touches. A transient passes its token and gets to edit
    // the nodes it already copied in place.

    pub(crate) fn conj_mut(&mut self, edit: Option<&Token>, value: T) {
        if self.count - self.tail_offset() < WIDTH {
            let tail = self
                .tail
                .get_or_insert_with(|| Arc::new(Node::leaf(edit, Chunk::new())));
            Node::editable(tail, edit).elems_mut().push_back(value);
        } else {
            let new_tail = Arc::new(Node::leaf(edit, Chunk::unit(value)));
            // The tail is full, so it exists.
            if let Some(full) = self.tail.replace(new_tail) {
                self.push_leaf(edit, full);
            }
        }
        self.count += 1;
    }

    /// Moves a full tail into the trie. Must be called before `count` is
    /// incremented for the new tail.
    fn push_leaf(&mut self, edit: Option<&Token>, leaf: Arc<Node<T>>) {
        match self.root.take() {
            None => {
                debug_assert_eq!(self.shift, BITS);
                self.root = Some(Arc::new(Node::branch(edit, Chunk::unit(leaf))));
            }
            Some(root) if (self.count >> BITS) > (1 << self.shift) => {
                // The root is full: grow a level.
                let mut children = Chunk::unit(root);
                children.push_back(Node::new_path(edit, self.shift, leaf));
                self.root = Some(Arc::new(Node::branch(edit, children)));
                self.shift += BITS;
                log::trace!("vector trie grew to height {}", self.shift / BITS);
            }
            Some(mut root) => {
                Node::push_tail(&mut root, edit, self.shift, self.count, leaf);
                self.root = Some(root);
            }
        }
    }

    pub(crate) fn assoc_n_mut(&mut self, edit: Option<&Token>, index: usize, value: T) -> Result<()> {
        if index == self.count {
            self.conj_mut(edit, value);
            return Ok(());
        }
        if index > self.count {
            return Err(Error::OutOfRange {
                index,
                len: self.count,
            });
        }

        if index >= self.tail_offset() {
            let tail = self.tail.as_mut().expect("non-empty vector without a tail");
            Node::editable(tail, edit).elems_mut()[index & MASK] = value;
        } else {
            let root = self.root.as_mut().expect("index below the tail without a trie");
            Node::assoc(root, edit, self.shift, index, value);
        }
        Ok(())
    }

    pub(crate) fn pop_mut(&mut self, edit: Option<&Token>) -> Result<()> {
        match self.count {
            0 => return Err(Error::EmptyPop),
            1 => {
                *self = Vector::new();
                return Ok(());
            }
            _ => {}
        }

        if self.count - self.tail_offset() > 1 {
            let tail = self.tail.as_mut().expect("non-empty vector without a tail");
            Node::editable(tail, edit).elems_mut().pop_back();
        } else {
            // The tail is about to be empty: the last leaf of the trie takes
            // its place.
            let new_tail = self.leaf_for(self.count - 2).cloned();
            let mut root = self.root.take().expect("more than one leaf without a trie");
            if !Node::pop_tail(&mut root, edit, self.shift, self.count) {
                if self.shift > BITS && root.children().len() == 1 {
                    root = Arc::clone(&root.children()[0]);
                    self.shift -= BITS;
                    log::trace!("vector trie shrank to height {}", self.shift / BITS);
                }
                self.root = Some(root);
            }
            self.tail = new_tail;
        }
        self.count -= 1;
        Ok(())
    }
}

impl<T> Default for Vector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Vector<T> {
    fn clone(&self) -> Self {
        Vector {
            count: self.count,
            shift: self.shift,
            root: self.root.clone(),
            tail: self.tail.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Vector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for Vector<T> {
    fn eq(&self, other: &Self) -> bool {
        self.count == other.count && self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for Vector<T> {}

impl<T: Equiv> Equiv for Vector<T> {
    fn hash_code(&self) -> u32 {
        hash_ordered(self.iter().map(Equiv::hash_code))
    }

    fn equiv(&self, other: &Self) -> bool {
        self.count == other.count && self.iter().zip(other.iter()).all(|(a, b)| a.equiv(b))
    }
}

impl<T> Index<usize> for Vector<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.get(index).expect("index out of range")
    }
}

impl<T: Clone> FromIterator<T> for Vector<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut ret = Vector::new();
        ret.extend(iter);
        ret
    }
}

impl<T: Clone> Extend<T> for Vector<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let token = Token::new();
        for elt in iter {
            self.conj_mut(Some(&token), elt);
        }
        let _ = token.invalidate();
    }
}

impl<'a, T> IntoIterator for &'a Vector<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Clone> IntoIterator for Vector<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.seq())
    }
}

impl<T: serde::Serialize> serde::Serialize for Vector<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;

        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for elt in self.iter() {
            seq.serialize_element(elt)?;
        }
        seq.end()
    }
}

impl<'de, T: Clone + serde::Deserialize<'de>> serde::Deserialize<'de> for Vector<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let vec: Vec<T> = Vec::deserialize(deserializer)?;
        Ok(vec.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Checks the shape invariants: packed branches, full leaves in the trie,
    /// a tail of the right length, and a root with at least two children
    /// whenever the trie is more than one level deep.
    fn check_invariants<T: Clone>(vec: &Vector<T>) {
        fn count_rec<T>(node: &Node<T>, level: u32) -> usize {
            if level == 0 {
                assert_eq!(node.elems().len(), WIDTH);
                WIDTH
            } else {
                let children = node.children();
                assert!(!children.is_empty());
                children.iter().map(|c| count_rec(c, level - BITS)).sum()
            }
        }

        let tail_len = vec.tail.as_ref().map_or(0, |t| t.elems().len());
        assert_eq!(tail_len, vec.count - vec.tail_offset());
        assert_eq!(vec.tail.is_none(), vec.count == 0);
        match &vec.root {
            None => {
                assert_eq!(vec.shift, BITS);
                assert_eq!(vec.tail_offset(), 0);
            }
            Some(root) => {
                if vec.shift > BITS {
                    assert!(root.children().len() > 1);
                }
                assert_eq!(count_rec(root, vec.shift), vec.tail_offset());
            }
        }
    }

    #[test]
    fn basic() {
        let vec = Vector::new();
        check_invariants(&vec);
        let vec = vec.conj(1);
        assert_eq!(vec.get(0), Some(&1));
        assert_eq!(vec.get(1), None);
        check_invariants(&vec);

        let vec = vec.conj(2).conj(3);
        check_invariants(&vec);
        assert_eq!(vec.get(0), Some(&1));
        assert_eq!(vec.get(1), Some(&2));
        assert_eq!(vec.get(2), Some(&3));
        assert_eq!(vec.get(3), None);

        let mut iter = vec.iter();
        assert_eq!(iter.next(), Some(&1));
        assert_eq!(iter.next(), Some(&2));
        assert_eq!(iter.next(), Some(&3));
        assert_eq!(iter.next(), None);

        let popped = vec.pop().unwrap();
        check_invariants(&popped);
        assert_eq!(popped.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(vec.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(vec.into_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn height_grows_at_33_and_1057() {
        let mut vec = Vector::new();
        for i in 1..=2000u32 {
            let before = vec.height();
            vec = vec.conj(i);
            let after = vec.height();
            match vec.len() {
                33 | 1057 => assert_eq!(after, before + 1, "at {}", vec.len()),
                _ => assert_eq!(after, before, "at {}", vec.len()),
            }
        }
        check_invariants(&vec);
        assert_eq!(vec.height(), 2);
    }

    #[test]
    fn pop_to_canonical_empty_root() {
        let vec: Vector<u32> = (0..33).collect();
        assert!(vec.root.is_some());
        let popped = vec.pop().unwrap();
        assert_eq!(popped.len(), 32);
        assert!(popped.root.is_none());
        assert_eq!(popped.shift, BITS);
        check_invariants(&popped);
        assert_eq!(popped.iter().copied().collect::<Vec<_>>(), (0..32).collect::<Vec<_>>());
    }

    #[test]
    fn pop_shrinks_height() {
        let vec: Vector<u32> = (0..1057).collect();
        assert_eq!(vec.height(), 2);
        let popped = vec.pop().unwrap();
        check_invariants(&popped);
        assert_eq!(popped.height(), 1);
        assert_eq!(popped.peek(), Some(&1055));
    }

    #[test]
    fn pop_everything() {
        let mut vec: Vector<u32> = (0..2100).collect();
        for expected_len in (0..2100).rev() {
            vec = vec.pop().unwrap();
            check_invariants(&vec);
            assert_eq!(vec.len(), expected_len);
            assert_eq!(vec.peek(), expected_len.checked_sub(1).map(|i| i as u32).as_ref());
        }
        assert_eq!(vec.pop().unwrap_err(), Error::EmptyPop);
    }

    #[test]
    fn assoc_n_copies_the_path() {
        let vec: Vector<u32> = (0..100).collect();
        let changed = vec.assoc_n(5, 500).unwrap();
        let in_tail = changed.assoc_n(97, 970).unwrap();
        let appended = in_tail.assoc_n(100, 1000).unwrap();
        check_invariants(&appended);

        assert_eq!(vec[5], 5);
        assert_eq!(changed[5], 500);
        assert_eq!(in_tail[97], 970);
        assert_eq!(changed[97], 97);
        assert_eq!(appended.len(), 101);
        assert_eq!(appended[100], 1000);

        // Leaves off the edited path are shared.
        let old_root = vec.root.as_ref().unwrap();
        let new_root = changed.root.as_ref().unwrap();
        assert!(!Arc::ptr_eq(&old_root.children()[0], &new_root.children()[0]));
        assert!(Arc::ptr_eq(&old_root.children()[1], &new_root.children()[1]));
        assert!(Arc::ptr_eq(vec.tail.as_ref().unwrap(), changed.tail.as_ref().unwrap()));

        assert_eq!(
            vec.assoc_n(101, 0).unwrap_err(),
            Error::OutOfRange { index: 101, len: 100 }
        );
    }

    #[test]
    fn lookups() {
        let vec: Vector<u32> = (0..40).collect();
        assert_eq!(vec.nth(39), Ok(&39));
        assert_eq!(vec.nth(40), Err(Error::OutOfRange { index: 40, len: 40 }));
        assert_eq!(*vec.nth_or(40, &7), 7);
        assert_eq!(*vec.nth_or(3, &7), 3);
        assert_eq!(Vector::<u32>::new().peek(), None);
        assert_eq!(Vector::unit(4).peek(), Some(&4));
    }

    #[test]
    fn equivalence() {
        let a: Vector<u32> = (0..50).collect();
        let b: Vector<u32> = (0..50).collect();
        let c = b.assoc_n(3, 0).unwrap();
        assert!(a.equiv(&b));
        assert_eq!(a.hash_code(), b.hash_code());
        assert!(!a.equiv(&c));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, a.pop().unwrap());
    }

    #[test]
    fn extend_seals_its_token() {
        let mut vec: Vector<u32> = (0..64).collect();
        vec.extend(64..100);
        check_invariants(&vec);
        assert_eq!(vec.iter().copied().collect::<Vec<_>>(), (0..100).collect::<Vec<_>>());

        // A later transient must not treat those nodes as its own.
        let before = vec.clone();
        let mut transient = vec.transient();
        transient.assoc_n(0, 1000).unwrap();
        transient.assoc_n(99, 1000).unwrap();
        let after = transient.finalize().unwrap();
        assert_eq!(before[0], 0);
        assert_eq!(before[99], 99);
        assert_eq!(after[0], 1000);
    }

    #[test]
    fn debug_as_list() {
        let vec: Vector<u32> = (0..3).collect();
        assert_eq!(format!("{vec:?}"), "[0, 1, 2]");
    }
}
