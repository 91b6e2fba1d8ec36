use trie_collections::Equiv;

/// A key with a chosen hash code.
///
/// Two `CollidingKey`s are equivalent when both fields are equal, but their
/// hash code is `hash` alone, so keys sharing a `hash` collide on all 32
/// bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, arbitrary::Arbitrary)]
pub struct CollidingKey {
    pub hash: u32,
    pub id: u32,
}

impl CollidingKey {
    pub fn new(hash: u32, id: u32) -> Self {
        CollidingKey { hash, id }
    }
}

impl Equiv for CollidingKey {
    fn hash_code(&self) -> u32 {
        self.hash
    }

    fn equiv(&self, other: &Self) -> bool {
        self == other
    }
}
