//! Persistent collections with structural sharing.
//!
//! [`Vector`] is a 32-way bitmapped vector trie with a tail buffer, and [`Map`]
//! is a hash array mapped trie. Both are immutable values: every modification
//! returns a new collection that shares all the untouched nodes with the old
//! one. Cloning is O(1).
//!
//! For batches of edits, [`Vector::transient`] and [`Map::transient`] open a
//! short-lived mutable session that edits the nodes it creates in place. A
//! session ends with `finalize`, which hands back an ordinary persistent
//! value; the transient is unusable afterwards.
//!
//! Keys and elements are hashed and compared through the [`Equiv`] trait
//! rather than `Hash`/`Eq`, which allows equivalences like the one [`Value`]
//! defines between integers and integral floats.

pub mod config;
mod error;
pub mod hash;
mod metrics;
pub mod map;
mod token;
mod value;
pub mod vector;

pub use error::{Error, Result};
pub use hash::Equiv;
pub use map::{Map, TransientMap};
pub use value::Value;
pub use vector::{TransientVector, Vector};
