//! The error type shared by every fallible operation in this crate.
//!
//! Tokenizer-level parse errors are deliberately *not* represented here:
//! they are recoverable by design and accumulate on the parser as plain
//! strings (see [`Parser::errors`](crate::Parser::errors)). Everything
//! else - structural violations, bad orderings, lookup misses, lifecycle
//! misuse - surfaces as an [`Error`] and leaves the tree untouched.

use std::io;

use derive_more::with_trait::Display;
use derive_more::with_trait::Error as StdError;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong outside of tokenization.
#[derive(Debug, Display, StdError)]
pub enum Error {
  /// An attachment would corrupt the tree: create a cycle, cross trees,
  /// give a Document/Fragment a parent, or anchor on an orphan.
  #[display("structural error: {_0}")]
  Structural(#[error(not(source))] String),

  /// The requested [`Ordering`](crate::Ordering) is not permitted for
  /// this node kind.
  #[display("invalid ordering: {_0}")]
  InvalidOrdering(#[error(not(source))] String),

  /// A key-based lookup found nothing.
  #[display("not found: {_0}")]
  NotFound(#[error(not(source))] String),

  /// A positional access went past the end.
  #[display("index out of bounds: the len is {len} but the index is {index}")]
  IndexOutOfBounds { index: usize, len: usize },

  /// A parser method was called in the wrong lifecycle state.
  #[display("illegal parser state: {_0}")]
  IllegalState(#[error(not(source))] String),

  /// A selector expression failed to compile, either from bad syntax or
  /// an unknown namespace prefix.
  #[display("invalid selector: {_0}")]
  InvalidSelector(#[error(not(source))] String),

  /// A [`NodeId`](crate::NodeId) lookup was resolved against a tree it
  /// does not belong to (including trees that have since been dropped).
  /// Attaching a node from another tree is [`Structural`](Self::Structural)
  /// instead.
  #[display("dangling handle: the node id does not belong to this tree")]
  DanglingHandle,

  /// Byte input could not be decoded under the detected encoding.
  #[display("decode error: {_0}")]
  Decode(#[error(not(source))] String),

  /// An I/O failure from `parse_file`/`parse_reader`.
  #[display("io error: {_0}")]
  Io(#[error(source)] io::Error),
}

impl From<io::Error> for Error {
  fn from(err: io::Error) -> Self {
    Error::Io(err)
  }
}

impl Error {
  pub(crate) fn structural(msg: impl Into<String>) -> Self {
    Error::Structural(msg.into())
  }

  pub(crate) fn illegal_state(msg: impl Into<String>) -> Self {
    Error::IllegalState(msg.into())
  }

  pub(crate) fn decode(msg: impl Into<String>) -> Self {
    Error::Decode(msg.into())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_formats() {
    let err = Error::Structural("cycle".into());
    assert_eq!(err.to_string(), "structural error: cycle");

    let err = Error::IndexOutOfBounds { index: 4, len: 2 };
    assert_eq!(
      err.to_string(),
      "index out of bounds: the len is 2 but the index is 4"
    );
  }

  #[test]
  fn io_errors_convert() {
    let err: Error = io::Error::new(io::ErrorKind::NotFound, "gone").into();
    assert!(matches!(err, Error::Io(_)));
  }
}
