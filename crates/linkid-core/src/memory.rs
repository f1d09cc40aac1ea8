//! [`MemoryStore`] — an in-process implementation of [`ContactStore`].
//!
//! Every unit of work locks the whole store, runs against a draft copy and
//! swaps the draft in only when the closure succeeds. Used by tests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::{
  contact::{Contact, ContactId, NewContact},
  store::{ContactStore, ContactTx},
};

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("contact not found: {0}")]
  ContactNotFound(ContactId),

  #[error("injected failure during {0:?}")]
  Injected(FailPoint),
}

/// Operation at which [`MemoryStore::fail_at`] makes the store fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
  Transact,
  Find,
  Insert,
  Update,
}

// ─── State ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
struct State {
  contacts: Vec<Contact>,
  next_id:  ContactId,
  fail_at:  Option<FailPoint>,
}

impl State {
  fn check(&self, point: FailPoint) -> Result<(), MemoryError> {
    match self.fail_at {
      Some(p) if p == point => Err(MemoryError::Injected(point)),
      _ => Ok(()),
    }
  }

  fn live(&self) -> impl Iterator<Item = &Contact> {
    self.contacts.iter().filter(|c| c.deleted_at.is_none())
  }

  fn earliest<'a>(matches: impl Iterator<Item = &'a Contact>) -> Option<Contact> {
    matches.min_by_key(|c| c.age_key()).cloned()
  }

  fn sorted(mut contacts: Vec<Contact>) -> Vec<Contact> {
    contacts.sort_by_key(Contact::age_key);
    contacts
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An in-memory contact store.
///
/// Cloning is cheap and clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
  state: Arc<Mutex<State>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// A store pre-populated with `contacts`, kept as given (ids, timestamps,
  /// tombstones). New ids continue after the largest seeded id.
  pub fn with_contacts(contacts: Vec<Contact>) -> Self {
    let next_id = contacts.iter().map(|c| c.id).max().unwrap_or(0);
    Self {
      state: Arc::new(Mutex::new(State { contacts, next_id, fail_at: None })),
    }
  }

  /// Make every subsequent operation of kind `point` fail; `None` clears it.
  pub async fn fail_at(&self, point: Option<FailPoint>) {
    self.state.lock().await.fail_at = point;
  }

  /// Every contact, tombstoned ones included, in insertion order.
  pub async fn snapshot(&self) -> Vec<Contact> { self.state.lock().await.contacts.clone() }
}

impl ContactStore for MemoryStore {
  type Error = MemoryError;

  async fn transact<T, E, F>(&self, f: F) -> Result<Result<T, E>, MemoryError>
  where
    T: Send + 'static,
    E: Send + 'static,
    F: FnOnce(&mut dyn ContactTx<Error = MemoryError>) -> Result<T, E> + Send + 'static,
  {
    let mut state = self.state.lock().await;
    state.check(FailPoint::Transact)?;

    let mut draft = state.clone();
    let outcome = f(&mut MemoryTx { state: &mut draft, now: Utc::now() });
    if outcome.is_ok() {
      *state = draft;
    }
    Ok(outcome)
  }
}

// ─── Unit of work ────────────────────────────────────────────────────────────

struct MemoryTx<'a> {
  state: &'a mut State,
  /// One clock reading per unit keeps timestamps within a unit identical.
  now:   DateTime<Utc>,
}

impl ContactTx for MemoryTx<'_> {
  type Error = MemoryError;

  fn find_by_email(&mut self, email: &str) -> Result<Option<Contact>, MemoryError> {
    self.state.check(FailPoint::Find)?;
    Ok(State::earliest(
      self.state.live().filter(|c| c.email.as_deref() == Some(email)),
    ))
  }

  fn find_by_phone(&mut self, phone: &str) -> Result<Option<Contact>, MemoryError> {
    self.state.check(FailPoint::Find)?;
    Ok(State::earliest(
      self.state.live().filter(|c| c.phone.as_deref() == Some(phone)),
    ))
  }

  fn find_by_id(&mut self, id: ContactId) -> Result<Option<Contact>, MemoryError> {
    self.state.check(FailPoint::Find)?;
    Ok(self.state.live().find(|c| c.id == id).cloned())
  }

  fn find_cluster(&mut self, primary_id: ContactId) -> Result<Vec<Contact>, MemoryError> {
    self.state.check(FailPoint::Find)?;
    let members = self
      .state
      .live()
      .filter(|c| c.id == primary_id || c.linked_id == Some(primary_id))
      .cloned()
      .collect();
    Ok(State::sorted(members))
  }

  fn insert(&mut self, input: NewContact) -> Result<Contact, MemoryError> {
    self.state.check(FailPoint::Insert)?;
    self.state.next_id += 1;
    let contact = Contact {
      id:         self.state.next_id,
      email:      input.email,
      phone:      input.phone,
      linked_id:  input.linked_id,
      precedence: input.precedence,
      created_at: self.now,
      updated_at: self.now,
      deleted_at: None,
    };
    self.state.contacts.push(contact.clone());
    Ok(contact)
  }

  fn update(&mut self, contact: &Contact) -> Result<Contact, MemoryError> {
    self.state.check(FailPoint::Update)?;
    let now = self.now;
    let stored = self
      .state
      .contacts
      .iter_mut()
      .find(|c| c.id == contact.id && c.deleted_at.is_none())
      .ok_or(MemoryError::ContactNotFound(contact.id))?;
    stored.precedence = contact.precedence;
    stored.linked_id = contact.linked_id;
    stored.updated_at = now;
    Ok(stored.clone())
  }

  fn list_all(&mut self) -> Result<Vec<Contact>, MemoryError> {
    self.state.check(FailPoint::Find)?;
    Ok(State::sorted(self.state.live().cloned().collect()))
  }
}
