use std::borrow::Borrow;

use crate::{
    error::{Error, Result},
    hash::Equiv,
    token::Token,
};

use super::Map;

/// A map under construction.
///
/// Like [`TransientVector`](crate::TransientVector), a transient map edits in
/// place the nodes it has created itself and copies everything else, so the
/// map it started from is never affected.
#[derive(Debug)]
pub struct TransientMap<K, V> {
    token: Token,
    map: Map<K, V>,
}

impl<K: Equiv + Clone, V: Clone> TransientMap<K, V> {
    pub(super) fn new(map: Map<K, V>) -> Self {
        TransientMap {
            token: Token::new(),
            map,
        }
    }

    pub fn count(&self) -> Result<usize> {
        self.token.ensure_live()?;
        Ok(self.map.len())
    }

    pub fn get<Q>(&self, key: &Q) -> Result<Option<&V>>
    where
        K: Borrow<Q>,
        Q: Equiv + ?Sized,
    {
        self.token.ensure_live()?;
        Ok(self.map.get(key))
    }

    pub fn contains_key<Q>(&self, key: &Q) -> Result<bool>
    where
        K: Borrow<Q>,
        Q: Equiv + ?Sized,
    {
        self.token.ensure_live()?;
        Ok(self.map.contains_key(key))
    }

    pub fn assoc(&mut self, key: K, value: V) -> Result<&mut Self> {
        self.token.ensure_live()?;
        self.map.assoc_mut(Some(&self.token), key, value);
        Ok(self)
    }

    /// Fails with [`Error::DuplicateKey`], leaving the transient unchanged,
    /// if `key` is already bound.
    pub fn assoc_new(&mut self, key: K, value: V) -> Result<&mut Self> {
        self.token.ensure_live()?;
        if self.map.contains_key(&key) {
            return Err(Error::DuplicateKey);
        }
        self.map.assoc_mut(Some(&self.token), key, value);
        Ok(self)
    }

    pub fn dissoc<Q>(&mut self, key: &Q) -> Result<&mut Self>
    where
        K: Borrow<Q>,
        Q: Equiv + ?Sized,
    {
        self.token.ensure_live()?;
        self.map.dissoc_mut(Some(&self.token), key);
        Ok(self)
    }

    /// Ends the session and returns the map that was built.
    pub fn finalize(&mut self) -> Result<Map<K, V>> {
        self.token.invalidate()?;
        log::trace!("finalized transient map with {} entries", self.map.len());
        Ok(std::mem::take(&mut self.map))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn build_then_finalize() {
        let mut transient = Map::new().transient();
        for i in 0..1000u32 {
            transient.assoc(i, i + 1).unwrap();
        }
        for i in (0..1000u32).step_by(2) {
            transient.dissoc(&i).unwrap();
        }
        assert_eq!(transient.count(), Ok(500));
        assert_eq!(transient.get(&1), Ok(Some(&2)));
        assert_eq!(transient.contains_key(&2), Ok(false));

        let map = transient.finalize().unwrap();
        assert_eq!(map.len(), 500);
        assert!((0..1000u32).all(|i| map.contains_key(&i) == (i % 2 == 1)));

        assert_matches!(transient.assoc(0, 0), Err(Error::UseAfterFinalize));
        assert_matches!(transient.dissoc(&1), Err(Error::UseAfterFinalize));
        assert_matches!(transient.get(&1), Err(Error::UseAfterFinalize));
        assert_matches!(transient.finalize(), Err(Error::UseAfterFinalize));
        assert_eq!(map.len(), 500);
    }

    #[test]
    fn source_is_untouched() {
        let source: Map<u32, u32> = (0..200).map(|i| (i, i)).collect();
        let mut transient = source.transient();
        transient.assoc(0, 100).unwrap().dissoc(&1).unwrap().assoc(500, 5).unwrap();
        let result = transient.finalize().unwrap();

        assert_eq!(source.len(), 200);
        assert_eq!(source.get(&0), Some(&0));
        assert_eq!(source.get(&1), Some(&1));
        assert_eq!(source.get(&500), None);
        assert_eq!(result.len(), 200);
        assert_eq!(result.get(&0), Some(&100));
        assert_eq!(result.get(&1), None);
        assert_eq!(result.get(&500), Some(&5));
    }

    #[test]
    fn owned_root_is_edited_in_place() {
        let source: Map<u32, u32> = (0..10).map(|i| (i, i)).collect();
        let mut transient = source.transient();
        transient.assoc(100, 0).unwrap();
        let root = Arc::as_ptr(transient.map.root.as_ref().unwrap());
        transient.assoc(0, 42).unwrap();
        assert_eq!(Arc::as_ptr(transient.map.root.as_ref().unwrap()), root);
        assert_ne!(Arc::as_ptr(source.root.as_ref().unwrap()), root);
    }

    #[derive(Clone, Debug, PartialEq)]
    struct SameHash(u32);

    impl Equiv for SameHash {
        fn hash_code(&self) -> u32 {
            42
        }

        fn equiv(&self, other: &Self) -> bool {
            self == other
        }
    }

    #[test]
    fn shared_collision_nodes_are_copied() {
        let source: Map<SameHash, u32> = (0..3).map(|i| (SameHash(i), i)).collect();
        let mut transient = source.transient();
        transient.assoc(SameHash(0), 100).unwrap();
        transient.assoc(SameHash(3), 3).unwrap();
        transient.dissoc(&SameHash(1)).unwrap();
        let edited = transient.finalize().unwrap();

        assert_eq!(source.len(), 3);
        assert_eq!(source.get(&SameHash(0)), Some(&0));
        assert_eq!(source.get(&SameHash(1)), Some(&1));
        assert_eq!(source.get(&SameHash(3)), None);
        assert_eq!(edited.len(), 3);
        assert_eq!(edited.get(&SameHash(0)), Some(&100));
        assert_eq!(edited.get(&SameHash(1)), None);
        assert_eq!(edited.get(&SameHash(3)), Some(&3));
    }

    #[test]
    fn shrinking_a_collision_node_pulls_its_entry_up() {
        let source: Map<SameHash, u32> = (0..3).map(|i| (SameHash(i), i)).collect();
        let mut transient = source.transient();
        transient
            .dissoc(&SameHash(0))
            .unwrap()
            .dissoc(&SameHash(2))
            .unwrap();
        let single = transient.finalize().unwrap();

        assert_eq!(single.len(), 1);
        assert_eq!(single.get(&SameHash(1)), Some(&1));
        // The last entry climbed all the way up to the root.
        let root = single.root.as_ref().unwrap();
        assert_eq!(root.entry_count(), 1);
        assert_eq!(root.child_count(), 0);

        assert_eq!(source.len(), 3);
        assert!((0..3).all(|i| source.get(&SameHash(i)) == Some(&i)));
    }

    #[test]
    fn duplicate_key_leaves_the_transient_usable() {
        let mut transient = Map::new().transient();
        transient.assoc_new("a", 1).unwrap();
        assert_matches!(transient.assoc_new("a", 2), Err(Error::DuplicateKey));
        transient.assoc_new("b", 2).unwrap();
        let map = transient.finalize().unwrap();
        assert_eq!(map.get("a"), Some(&1));
        assert_eq!(map.len(), 2);
    }
}
