//! Error types for `linkid-core`.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Any read or write failure reported by the contact store.
  #[error("contact store unavailable: {0}")]
  StoreUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("identify timed out after {0:?}")]
  Timeout(Duration),

  /// The stored contact graph violates a cluster invariant.
  #[error("inconsistent contact graph: {0}")]
  Inconsistent(String),
}

impl Error {
  pub(crate) fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::StoreUnavailable(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
