//! Random operation sequences, applied side by side to a collection and to a
//! `std` model of it.

use std::collections::HashMap;

use arbitrary::Unstructured;
use trie_collections::{Equiv, Map, TransientMap, TransientVector, Vector};

// u.arbitrary() generates very short vecs by default:
// https://github.com/matklad/arbtest/issues/8
pub fn arb_vec(u: &mut Unstructured<'_>) -> arbitrary::Result<Vec<u32>> {
    let len = u.arbitrary_len::<u32>()?;
    std::iter::from_fn(|| Some(u.arbitrary::<u32>()))
        .take(len)
        .collect()
}

#[derive(arbitrary::Arbitrary, Debug)]
pub enum VectorOp {
    Conj(u32),
    Pop,
    // Indices are taken modulo `len + 1`, so that appending is exercised too.
    AssocN(usize, u32),
    Extend(Vec<u32>),
    Snapshot,
}

impl VectorOp {
    pub fn apply_to_vec(&self, vec: &mut Vec<u32>) {
        match self {
            VectorOp::Conj(x) => vec.push(*x),
            VectorOp::Pop => {
                vec.pop();
            }
            VectorOp::AssocN(i, x) => {
                let i = i % (vec.len() + 1);
                if i == vec.len() {
                    vec.push(*x);
                } else {
                    vec[i] = *x;
                }
            }
            VectorOp::Extend(xs) => vec.extend_from_slice(xs),
            VectorOp::Snapshot => {}
        }
    }

    /// Applies the operation persistently. Snapshots are kept in `arena`, so
    /// that later operations run on shared nodes.
    pub fn apply_to_vector(&self, vec: &mut Vector<u32>, arena: &mut Vec<Vector<u32>>) {
        match self {
            VectorOp::Conj(x) => *vec = vec.conj(*x),
            VectorOp::Pop => {
                if !vec.is_empty() {
                    *vec = vec.pop().unwrap();
                }
            }
            VectorOp::AssocN(i, x) => {
                let i = i % (vec.len() + 1);
                *vec = vec.assoc_n(i, *x).unwrap();
            }
            VectorOp::Extend(xs) => vec.extend(xs.iter().copied()),
            VectorOp::Snapshot => arena.push(vec.clone()),
        }
    }

    pub fn apply_to_transient(&self, vec: &mut TransientVector<u32>) {
        match self {
            VectorOp::Conj(x) => {
                vec.conj(*x).unwrap();
            }
            VectorOp::Pop => {
                if vec.count().unwrap() > 0 {
                    vec.pop().unwrap();
                }
            }
            VectorOp::AssocN(i, x) => {
                let i = i % (vec.count().unwrap() + 1);
                vec.assoc_n(i, *x).unwrap();
            }
            VectorOp::Extend(xs) => {
                for x in xs {
                    vec.conj(*x).unwrap();
                }
            }
            VectorOp::Snapshot => {}
        }
    }
}

#[derive(arbitrary::Arbitrary, Debug)]
pub enum MapOp<K> {
    Assoc(K, u32),
    Dissoc(K),
    Snapshot,
}

impl<K: Equiv + Clone + Eq + std::hash::Hash> MapOp<K> {
    pub fn apply_to_hash_map(&self, map: &mut HashMap<K, u32>) {
        match self {
            MapOp::Assoc(k, v) => {
                map.insert(k.clone(), *v);
            }
            MapOp::Dissoc(k) => {
                map.remove(k);
            }
            MapOp::Snapshot => {}
        }
    }

    pub fn apply_to_map(&self, map: &mut Map<K, u32>, arena: &mut Vec<Map<K, u32>>) {
        match self {
            MapOp::Assoc(k, v) => *map = map.assoc(k.clone(), *v),
            MapOp::Dissoc(k) => *map = map.dissoc(k),
            MapOp::Snapshot => arena.push(map.clone()),
        }
    }

    pub fn apply_to_transient(&self, map: &mut TransientMap<K, u32>) {
        match self {
            MapOp::Assoc(k, v) => {
                map.assoc(k.clone(), *v).unwrap();
            }
            MapOp::Dissoc(k) => {
                map.dissoc(k).unwrap();
            }
            MapOp::Snapshot => {}
        }
    }
}
