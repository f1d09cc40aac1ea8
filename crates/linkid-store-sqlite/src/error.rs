//! Error type for `linkid-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown precedence: {0:?}")]
  UnknownPrecedence(String),

  /// An id that does not fit the other side's integer type.
  #[error("contact id out of range: {0}")]
  IdOutOfRange(i128),

  #[error("database schema version {found} is newer than supported version {supported}")]
  SchemaTooNew { found: i64, supported: i64 },

  /// Attempted to update a contact that does not exist or is tombstoned.
  #[error("contact not found: {0}")]
  ContactNotFound(u64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
