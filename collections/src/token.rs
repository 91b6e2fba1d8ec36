//! Ownership tokens for transient sessions.
//!
//! A transient collection allocates one [`Token`] and stamps it on every node
//! it creates. While the session is live, a node carrying the session's token
//! is known to be reachable only through the transient, so it may be edited
//! in place; any other node has to be copied first. Finalizing the session
//! kills the token, which freezes every node it stamped.
//!
//! Ownership is decided by token identity only. Nodes built by persistent
//! operations carry no token at all, so they are never edited in place.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::error::{Error, Result};

#[derive(Clone, Debug)]
pub(crate) struct Token(Arc<AtomicBool>);

impl Token {
    pub(crate) fn new() -> Self {
        Token(Arc::new(AtomicBool::new(true)))
    }

    pub(crate) fn is_live(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Fails with [`Error::UseAfterFinalize`] once the session is over.
    pub(crate) fn ensure_live(&self) -> Result<()> {
        if self.is_live() {
            Ok(())
        } else {
            Err(Error::UseAfterFinalize)
        }
    }

    /// Ends the session. Only the first call succeeds.
    pub(crate) fn invalidate(&self) -> Result<()> {
        if self.0.swap(false, Ordering::AcqRel) {
            Ok(())
        } else {
            Err(Error::UseAfterFinalize)
        }
    }

    pub(crate) fn same(&self, other: &Token) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Whether a node stamped with `stamp` may be edited in place by the session
/// holding `active`.
pub(crate) fn owns(active: Option<&Token>, stamp: Option<&Token>) -> bool {
    matches!((active, stamp), (Some(a), Some(s)) if a.same(s))
}
