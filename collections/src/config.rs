//! Geometry of the tries.
//!
//! Both the vector and the map consume their index (resp. hash) five bits at
//! a time, so every interior node has at most 32 children.

/// Number of index or hash bits consumed per trie level.
pub const BITS: u32 = 5;

/// Branching factor of every node.
pub const WIDTH: usize = 1 << BITS;

/// Mask selecting one level's worth of bits.
pub const MASK: usize = WIDTH - 1;

/// Width of a hash code, in bits.
pub const HASH_BITS: u32 = u32::BITS;

/// The deepest shift at which a map node still discriminates on hash bits.
/// Keys that agree on every fragment up to and including this level end up in
/// a collision node.
pub const MAX_SHIFT: u32 = (HASH_BITS - 1) / BITS * BITS;

/// Upper bound on the number of nodes on any root-to-leaf path of a map,
/// counting the collision node.
pub const MAX_MAP_DEPTH: usize = (MAX_SHIFT / BITS) as usize + 2;

/// Number of entries past which a linear-scan array map should promote itself
/// to a [`Map`](crate::Map). Nothing in this crate scans linearly; the
/// constant is exported for collections layered on top.
pub const ARRAY_MAP_THRESHOLD: usize = 8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry() {
        assert_eq!(WIDTH, 32);
        assert_eq!(MASK, 31);
        assert_eq!(MAX_SHIFT, 30);
        assert_eq!(MAX_MAP_DEPTH, 8);
    }
}
