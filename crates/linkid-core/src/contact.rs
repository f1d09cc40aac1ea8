//! Contacts, the single persisted entity, and the signal that resolves to them.
//!
//! A contact carries at most one email and one phone number. Contacts that
//! share a channel are grouped into a cluster anchored by exactly one
//! [`Precedence::Primary`] record; every other member is a
//! [`Precedence::Secondary`] whose `linked_id` points straight at that
//! primary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned contact identifier. Never reused.
pub type ContactId = u64;

// ─── Precedence ──────────────────────────────────────────────────────────────

/// The role a contact plays in its cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precedence {
  Primary,
  Secondary,
}

// ─── Contact ─────────────────────────────────────────────────────────────────

/// A stored contact record.
///
/// `email` and `phone` are written once at creation. Only `precedence`,
/// `linked_id` and `updated_at` change, and only when a merge demotes a
/// primary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
  pub id:         ContactId,
  pub email:      Option<String>,
  pub phone:      Option<String>,
  /// Set on secondaries only; always the id of the cluster's primary.
  pub linked_id:  Option<ContactId>,
  pub precedence: Precedence,
  /// Server-assigned; the ordering basis for every tie-break.
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  /// Soft-delete tombstone. Tombstoned contacts are invisible to lookups.
  pub deleted_at: Option<DateTime<Utc>>,
}

impl Contact {
  pub fn is_primary(&self) -> bool { self.precedence == Precedence::Primary }

  /// The id of the primary this contact's cluster resolves to, as recorded on
  /// the contact itself. `None` only for a secondary with no link, which is
  /// an invariant violation.
  pub fn anchor_id(&self) -> Option<ContactId> {
    match self.precedence {
      Precedence::Primary => Some(self.id),
      Precedence::Secondary => self.linked_id,
    }
  }

  /// Total order used to pick the surviving primary of a merge: older first,
  /// lower id on equal timestamps.
  pub fn age_key(&self) -> (DateTime<Utc>, ContactId) {
    (self.created_at, self.id)
  }
}

// ─── NewContact ──────────────────────────────────────────────────────────────

/// Input to [`crate::store::ContactTx::insert`].
/// `id`, `created_at` and `updated_at` are always set by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
  pub email:      Option<String>,
  pub phone:      Option<String>,
  pub linked_id:  Option<ContactId>,
  pub precedence: Precedence,
}

impl NewContact {
  pub fn primary(signal: &Signal) -> Self {
    Self {
      email:      signal.email.clone(),
      phone:      signal.phone.clone(),
      linked_id:  None,
      precedence: Precedence::Primary,
    }
  }

  pub fn secondary(signal: &Signal, anchor: ContactId) -> Self {
    Self {
      email:      signal.email.clone(),
      phone:      signal.phone.clone(),
      linked_id:  Some(anchor),
      precedence: Precedence::Secondary,
    }
  }
}

// ─── Signal ──────────────────────────────────────────────────────────────────

/// A partial contact signal submitted for identification.
///
/// Empty strings are folded to `None` by [`Signal::new`], so a present
/// channel is always a non-empty value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signal {
  pub email: Option<String>,
  pub phone: Option<String>,
}

impl Signal {
  pub fn new(email: Option<String>, phone: Option<String>) -> Self {
    Self {
      email: email.filter(|e| !e.is_empty()),
      phone: phone.filter(|p| !p.is_empty()),
    }
  }

  pub fn is_empty(&self) -> bool { self.email.is_none() && self.phone.is_none() }
}
