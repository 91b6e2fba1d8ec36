use crate::{error::Result, token::Token};

use super::Vector;

/// A vector under construction.
///
/// A transient runs the same algorithms as [`Vector`], but nodes it has
/// already copied once are edited in place from then on. Nodes shared with
/// the vector it started from (or with anything else) are never modified.
///
/// Once [`finalize`](Self::finalize) has been called, every method fails with
/// [`Error::UseAfterFinalize`](crate::Error::UseAfterFinalize).
#[derive(Debug)]
pub struct TransientVector<T> {
    token: Token,
    vec: Vector<T>,
}

impl<T: Clone> TransientVector<T> {
    pub(super) fn new(vec: Vector<T>) -> Self {
        TransientVector {
            token: Token::new(),
            vec,
        }
    }

    pub fn count(&self) -> Result<usize> {
        self.token.ensure_live()?;
        Ok(self.vec.len())
    }

    pub fn get(&self, index: usize) -> Result<Option<&T>> {
        self.token.ensure_live()?;
        Ok(self.vec.get(index))
    }

    pub fn nth(&self, index: usize) -> Result<&T> {
        self.token.ensure_live()?;
        self.vec.nth(index)
    }

    pub fn conj(&mut self, value: T) -> Result<&mut Self> {
        self.token.ensure_live()?;
        self.vec.conj_mut(Some(&self.token), value);
        Ok(self)
    }

    pub fn assoc_n(&mut self, index: usize, value: T) -> Result<&mut Self> {
        self.token.ensure_live()?;
        self.vec.assoc_n_mut(Some(&self.token), index, value)?;
        Ok(self)
    }

    pub fn pop(&mut self) -> Result<&mut Self> {
        self.token.ensure_live()?;
        self.vec.pop_mut(Some(&self.token))?;
        Ok(self)
    }

    /// Ends the session and returns the vector that was built.
    pub fn finalize(&mut self) -> Result<Vector<T>> {
        self.token.invalidate()?;
        log::trace!("finalized transient vector of length {}", self.vec.len());
        Ok(std::mem::take(&mut self.vec))
    }
}
