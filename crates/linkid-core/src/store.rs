//! The `ContactStore` / `ContactTx` traits.
//!
//! Backends (e.g. `linkid-store-sqlite`, [`crate::memory::MemoryStore`])
//! implement [`ContactStore`]. The resolver depends on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use crate::contact::{Contact, ContactId, NewContact};

// ─── Unit of work ────────────────────────────────────────────────────────────

/// Operations available inside one unit of work.
///
/// Every lookup ignores tombstoned contacts. Writes made through a `ContactTx`
/// become visible to other units only if the enclosing
/// [`ContactStore::transact`] closure returns `Ok`.
pub trait ContactTx {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Exact match on `email`. When several contacts share the address, the
  /// earliest-created (then lowest id) wins.
  fn find_by_email(&mut self, email: &str) -> Result<Option<Contact>, Self::Error>;

  /// Exact match on `phone`, with the same tie-break as
  /// [`find_by_email`](Self::find_by_email).
  fn find_by_phone(&mut self, phone: &str) -> Result<Option<Contact>, Self::Error>;

  fn find_by_id(&mut self, id: ContactId) -> Result<Option<Contact>, Self::Error>;

  /// All contacts with `id == primary_id` or `linked_id == primary_id`,
  /// ordered by `(created_at, id)`.
  fn find_cluster(&mut self, primary_id: ContactId) -> Result<Vec<Contact>, Self::Error>;

  /// Persist a new contact and return it with `id`, `created_at` and
  /// `updated_at` assigned.
  fn insert(&mut self, input: NewContact) -> Result<Contact, Self::Error>;

  /// Persist `precedence` and `linked_id` of an existing contact. Returns the
  /// stored record with a refreshed `updated_at`. Fails if the contact does
  /// not exist or is tombstoned.
  fn update(&mut self, contact: &Contact) -> Result<Contact, Self::Error>;

  /// Every live contact ordered by `(created_at, id)`.
  fn list_all(&mut self) -> Result<Vec<Contact>, Self::Error>;
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Abstraction over a linkid contact store backend.
///
/// All access goes through [`transact`](Self::transact), which runs a
/// synchronous closure as one atomic unit, serialised against every other
/// unit on the same store. This is what linearises concurrent `identify`
/// calls touching the same channels.
///
/// The returned future is `Send` so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait ContactStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Run `f` inside one unit of work.
  ///
  /// If `f` returns `Ok` the unit commits; if it returns `Err` every write it
  /// made is discarded. The outer `Result` reports failures of the unit
  /// itself (begin/commit); the inner one is whatever `f` returned.
  fn transact<T, E, F>(
    &self,
    f: F,
  ) -> impl Future<Output = Result<Result<T, E>, Self::Error>> + Send + '_
  where
    T: Send + 'static,
    E: Send + 'static,
    F: FnOnce(&mut dyn ContactTx<Error = Self::Error>) -> Result<T, E>
      + Send
      + 'static;
}
