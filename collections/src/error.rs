//! Errors reported by the collections.

/// An error from a collection operation.
///
/// None of these leave a collection half-modified: an operation that fails
/// does so before any node is copied or edited.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An indexed lookup or update with no default fell outside the vector.
    #[error("index {index} is out of range for a vector of length {len}")]
    OutOfRange { index: usize, len: usize },

    /// A keyed lookup with no default found nothing.
    #[error("key is not present in the map")]
    MissingKey,

    /// A bulk insert met a key/value pair with the wrong number of items.
    #[error("expected a key/value pair, got {len} item(s)")]
    InvalidPairShape { len: usize },

    /// An insert that only accepts fresh keys found the key already present.
    #[error("duplicate key")]
    DuplicateKey,

    /// A transient was used after it was finalized.
    #[error("transient used after finalize")]
    UseAfterFinalize,

    #[error("can't pop an empty vector")]
    EmptyPop,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
