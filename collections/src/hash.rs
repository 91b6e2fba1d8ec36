//! Hashing and equivalence for collection keys and elements.
//!
//! Hash codes are 32 bits wide and are produced with Murmur3 mixing, so that
//! the bits consumed by the map trie are well distributed even for small
//! integer keys.

use std::{rc::Rc, sync::Arc};

/// Structural equivalence with a compatible hash.
///
/// Implementations must be reflexive and symmetric, and `a.equiv(b)` must
/// imply `a.hash_code() == b.hash_code()`. Equivalence is allowed to be
/// coarser than `PartialEq`: [`Value`](crate::Value) treats the integer `1`
/// and the float `1.0` as the same key.
pub trait Equiv {
    fn hash_code(&self) -> u32;

    fn equiv(&self, other: &Self) -> bool;
}

const SEED: u32 = 0;
const C1: u32 = 0xcc9e_2d51;
const C2: u32 = 0x1b87_3593;

fn mix_k1(k1: u32) -> u32 {
    k1.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2)
}

fn mix_h1(h1: u32, k1: u32) -> u32 {
    (h1 ^ k1)
        .rotate_left(13)
        .wrapping_mul(5)
        .wrapping_add(0xe654_6b64)
}

fn fmix(mut h1: u32, length: u32) -> u32 {
    h1 ^= length;
    h1 ^= h1 >> 16;
    h1 = h1.wrapping_mul(0x85eb_ca6b);
    h1 ^= h1 >> 13;
    h1 = h1.wrapping_mul(0xc2b2_ae35);
    h1 ^ (h1 >> 16)
}

pub fn hash_int(input: i32) -> u32 {
    if input == 0 {
        return 0;
    }
    let h1 = mix_h1(SEED, mix_k1(input as u32));
    fmix(h1, 4)
}

pub fn hash_long(input: i64) -> u32 {
    if input == 0 {
        return 0;
    }
    let bits = input as u64;
    let mut h1 = mix_h1(SEED, mix_k1(bits as u32));
    h1 = mix_h1(h1, mix_k1((bits >> 32) as u32));
    fmix(h1, 8)
}

/// Hashes a string over its UTF-16 code units, two units per block.
pub fn hash_str(input: &str) -> u32 {
    let mut h1 = SEED;
    let mut units = 0u32;
    let mut pending: Option<u16> = None;
    for unit in input.encode_utf16() {
        units = units.wrapping_add(1);
        match pending.take() {
            Some(low) => {
                let k1 = u32::from(low) | (u32::from(unit) << 16);
                h1 = mix_h1(h1, mix_k1(k1));
            }
            None => pending = Some(unit),
        }
    }
    if let Some(low) = pending {
        h1 ^= mix_k1(u32::from(low));
    }
    fmix(h1, units.wrapping_mul(2))
}

/// Final mix of an aggregate hash with the number of elements it covers.
pub fn mix_coll_hash(hash: u32, count: usize) -> u32 {
    let h1 = mix_h1(SEED, mix_k1(hash));
    fmix(h1, count as u32)
}

/// Order-sensitive combination of element hashes, for sequences.
pub fn hash_ordered<I: IntoIterator<Item = u32>>(hashes: I) -> u32 {
    let mut count = 0;
    let mut hash = 1u32;
    for h in hashes {
        hash = hash.wrapping_mul(31).wrapping_add(h);
        count += 1;
    }
    mix_coll_hash(hash, count)
}

/// Order-insensitive combination of element hashes, for maps and sets.
pub fn hash_unordered<I: IntoIterator<Item = u32>>(hashes: I) -> u32 {
    let mut count = 0;
    let mut hash = 0u32;
    for h in hashes {
        hash = hash.wrapping_add(h);
        count += 1;
    }
    mix_coll_hash(hash, count)
}

macro_rules! impl_equiv_integer {
    ( $( $t:ty ),* ) => {
        $(
            impl Equiv for $t {
                fn hash_code(&self) -> u32 {
                    hash_long(*self as i64)
                }

                fn equiv(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

impl_equiv_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Hash of a float. Integral floats hash like the equal integer.
pub(crate) fn hash_f64(f: f64) -> u32 {
    match integral_f64(f) {
        Some(i) => hash_long(i),
        None => hash_long(f.to_bits() as i64),
    }
}

/// The integer a float is exactly equal to, if any.
pub(crate) fn integral_f64(f: f64) -> Option<i64> {
    // `i64::MAX as f64` rounds up to 2^63, which is out of range.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (f.fract() == 0.0 && (-LIMIT..LIMIT).contains(&f)).then_some(f as i64)
}

impl Equiv for f64 {
    fn hash_code(&self) -> u32 {
        hash_f64(*self)
    }

    // Bitwise fallback keeps NaN equivalent to itself.
    fn equiv(&self, other: &Self) -> bool {
        self == other || self.to_bits() == other.to_bits()
    }
}

impl Equiv for f32 {
    fn hash_code(&self) -> u32 {
        hash_f64(f64::from(*self))
    }

    fn equiv(&self, other: &Self) -> bool {
        self == other || self.to_bits() == other.to_bits()
    }
}

impl Equiv for bool {
    fn hash_code(&self) -> u32 {
        if *self {
            1231
        } else {
            1237
        }
    }

    fn equiv(&self, other: &Self) -> bool {
        self == other
    }
}

impl Equiv for char {
    fn hash_code(&self) -> u32 {
        hash_int(*self as i32)
    }

    fn equiv(&self, other: &Self) -> bool {
        self == other
    }
}

impl Equiv for () {
    fn hash_code(&self) -> u32 {
        0
    }

    fn equiv(&self, _other: &Self) -> bool {
        true
    }
}

impl Equiv for str {
    fn hash_code(&self) -> u32 {
        hash_str(self)
    }

    fn equiv(&self, other: &Self) -> bool {
        self == other
    }
}

impl Equiv for String {
    fn hash_code(&self) -> u32 {
        hash_str(self)
    }

    fn equiv(&self, other: &Self) -> bool {
        self == other
    }
}

impl<T: Equiv + ?Sized> Equiv for &T {
    fn hash_code(&self) -> u32 {
        (**self).hash_code()
    }

    fn equiv(&self, other: &Self) -> bool {
        (**self).equiv(*other)
    }
}

impl<T: Equiv + ?Sized> Equiv for Box<T> {
    fn hash_code(&self) -> u32 {
        (**self).hash_code()
    }

    fn equiv(&self, other: &Self) -> bool {
        (**self).equiv(other)
    }
}

impl<T: Equiv + ?Sized> Equiv for Rc<T> {
    fn hash_code(&self) -> u32 {
        (**self).hash_code()
    }

    fn equiv(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other) || (**self).equiv(other)
    }
}

impl<T: Equiv + ?Sized> Equiv for Arc<T> {
    fn hash_code(&self) -> u32 {
        (**self).hash_code()
    }

    fn equiv(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other) || (**self).equiv(other)
    }
}

impl<T: Equiv> Equiv for Option<T> {
    fn hash_code(&self) -> u32 {
        self.as_ref().map_or(0, Equiv::hash_code)
    }

    fn equiv(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.equiv(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<A: Equiv, B: Equiv> Equiv for (A, B) {
    fn hash_code(&self) -> u32 {
        hash_ordered([self.0.hash_code(), self.1.hash_code()])
    }

    fn equiv(&self, other: &Self) -> bool {
        self.0.equiv(&other.0) && self.1.equiv(&other.1)
    }
}
