//! [`SqliteStore`] — the SQLite implementation of [`ContactStore`].

use std::{path::Path, time::Duration};

use chrono::{DateTime, SubsecRound as _, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};

use linkid_core::{
  contact::{Contact, ContactId, NewContact},
  store::{ContactStore, ContactTx},
};

use crate::{
  Error, Result,
  encode::{CONTACT_COLUMNS, RawContact, decode_id, encode_dt, encode_id, encode_precedence},
  schema::{PRAGMAS, SCHEMA, SCHEMA_VERSION},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A linkid contact store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All clones
/// share one connection thread, so units of work from this process never
/// interleave; `BEGIN IMMEDIATE` extends that to other processes.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  ///
  /// `busy_timeout` bounds how long a unit of work waits for another
  /// process's write lock before failing.
  pub async fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
    let path = path.as_ref().to_path_buf();
    let conn = tokio_rusqlite::Connection::open(&path).await?;
    let store = Self { conn };
    store.init(busy_timeout).await?;
    tracing::debug!(path = %path.display(), "opened sqlite contact store");
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init(Duration::from_secs(5)).await?;
    Ok(store)
  }

  /// Apply connection settings, then create the schema unless the database
  /// already records [`SCHEMA_VERSION`].
  pub(crate) async fn init(&self, busy_timeout: Duration) -> Result<()> {
    let found = self
      .conn
      .call(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(PRAGMAS)?;
        Ok(conn.pragma_query_value(None, "user_version", |row| row.get::<_, i64>(0))?)
      })
      .await?;

    if found > SCHEMA_VERSION {
      return Err(Error::SchemaTooNew { found, supported: SCHEMA_VERSION });
    }
    if found < SCHEMA_VERSION {
      self
        .conn
        .call(|conn| {
          conn.execute_batch(SCHEMA)?;
          Ok(())
        })
        .await?;
      tracing::info!(from = found, to = SCHEMA_VERSION, "applied contact store schema");
    }
    Ok(())
  }

  #[cfg(test)]
  pub(crate) fn connection(&self) -> &tokio_rusqlite::Connection { &self.conn }
}

// ─── ContactStore impl ───────────────────────────────────────────────────────

impl ContactStore for SqliteStore {
  type Error = Error;

  async fn transact<T, E, F>(&self, f: F) -> Result<Result<T, E>>
  where
    T: Send + 'static,
    E: Send + 'static,
    F: FnOnce(&mut dyn ContactTx<Error = Error>) -> Result<T, E> + Send + 'static,
  {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = f(&mut SqliteTx {
          conn: &*tx,
          now:  Utc::now().trunc_subsecs(6),
        });
        // Dropping an uncommitted transaction rolls it back.
        if outcome.is_ok() {
          tx.commit()?;
        }
        Ok(outcome)
      })
      .await?;
    Ok(outcome)
  }
}

// ─── Unit of work ────────────────────────────────────────────────────────────

struct SqliteTx<'a> {
  conn: &'a rusqlite::Connection,
  /// Truncated to the stored precision so returned records compare equal to
  /// re-read ones.
  now:  DateTime<Utc>,
}

impl SqliteTx<'_> {
  fn query_one(&self, sql: &str, params: impl rusqlite::Params) -> Result<Option<Contact>> {
    let raw = self
      .conn
      .prepare_cached(sql)?
      .query_row(params, RawContact::from_row)
      .optional()?;
    raw.map(RawContact::into_contact).transpose()
  }

  fn query_many(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Contact>> {
    let mut stmt = self.conn.prepare_cached(sql)?;
    let raws = stmt
      .query_map(params, RawContact::from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    raws.into_iter().map(RawContact::into_contact).collect()
  }
}

impl ContactTx for SqliteTx<'_> {
  type Error = Error;

  fn find_by_email(&mut self, email: &str) -> Result<Option<Contact>> {
    self.query_one(
      &format!(
        "SELECT {CONTACT_COLUMNS} FROM contacts
         WHERE email = ?1 AND deleted_at IS NULL
         ORDER BY created_at, id LIMIT 1"
      ),
      rusqlite::params![email],
    )
  }

  fn find_by_phone(&mut self, phone: &str) -> Result<Option<Contact>> {
    self.query_one(
      &format!(
        "SELECT {CONTACT_COLUMNS} FROM contacts
         WHERE phone = ?1 AND deleted_at IS NULL
         ORDER BY created_at, id LIMIT 1"
      ),
      rusqlite::params![phone],
    )
  }

  fn find_by_id(&mut self, id: ContactId) -> Result<Option<Contact>> {
    let Ok(id) = i64::try_from(id) else { return Ok(None) };
    self.query_one(
      &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1 AND deleted_at IS NULL"),
      rusqlite::params![id],
    )
  }

  fn find_cluster(&mut self, primary_id: ContactId) -> Result<Vec<Contact>> {
    let Ok(primary_id) = i64::try_from(primary_id) else { return Ok(Vec::new()) };
    self.query_many(
      &format!(
        "SELECT {CONTACT_COLUMNS} FROM contacts
         WHERE (id = ?1 OR linked_id = ?1) AND deleted_at IS NULL
         ORDER BY created_at, id"
      ),
      rusqlite::params![primary_id],
    )
  }

  fn insert(&mut self, input: NewContact) -> Result<Contact> {
    let linked_id  = input.linked_id.map(encode_id).transpose()?;
    let precedence = encode_precedence(input.precedence);
    let at         = encode_dt(self.now);

    self.conn.execute(
      "INSERT INTO contacts (email, phone, linked_id, precedence, created_at, updated_at)
       VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
      rusqlite::params![input.email, input.phone, linked_id, precedence, at],
    )?;

    Ok(Contact {
      id:         decode_id(self.conn.last_insert_rowid())?,
      email:      input.email,
      phone:      input.phone,
      linked_id:  input.linked_id,
      precedence: input.precedence,
      created_at: self.now,
      updated_at: self.now,
      deleted_at: None,
    })
  }

  fn update(&mut self, contact: &Contact) -> Result<Contact> {
    let id         = encode_id(contact.id)?;
    let linked_id  = contact.linked_id.map(encode_id).transpose()?;
    let precedence = encode_precedence(contact.precedence);
    let at         = encode_dt(self.now);

    let changed = self.conn.execute(
      "UPDATE contacts SET precedence = ?1, linked_id = ?2, updated_at = ?3
       WHERE id = ?4 AND deleted_at IS NULL",
      rusqlite::params![precedence, linked_id, at, id],
    )?;
    if changed == 0 {
      return Err(Error::ContactNotFound(contact.id));
    }

    self.find_by_id(contact.id)?.ok_or(Error::ContactNotFound(contact.id))
  }

  fn list_all(&mut self) -> Result<Vec<Contact>> {
    self.query_many(
      &format!(
        "SELECT {CONTACT_COLUMNS} FROM contacts
         WHERE deleted_at IS NULL
         ORDER BY created_at, id"
      ),
      rusqlite::params![],
    )
  }
}
