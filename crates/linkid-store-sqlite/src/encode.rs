//! Encoding and decoding helpers between linkid domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so that lexical order in SQL matches chronological
//! order. Ids are SQLite `INTEGER`s.

use chrono::{DateTime, SecondsFormat, Utc};
use linkid_core::contact::{Contact, ContactId, Precedence};

use crate::{Error, Result};

// ─── Ids ─────────────────────────────────────────────────────────────────────

pub fn encode_id(id: ContactId) -> Result<i64> {
  i64::try_from(id).map_err(|_| Error::IdOutOfRange(i128::from(id)))
}

pub fn decode_id(raw: i64) -> Result<ContactId> {
  ContactId::try_from(raw).map_err(|_| Error::IdOutOfRange(i128::from(raw)))
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Precedence ──────────────────────────────────────────────────────────────

pub fn encode_precedence(p: Precedence) -> &'static str {
  match p {
    Precedence::Primary => "primary",
    Precedence::Secondary => "secondary",
  }
}

pub fn decode_precedence(s: &str) -> Result<Precedence> {
  match s {
    "primary" => Ok(Precedence::Primary),
    "secondary" => Ok(Precedence::Secondary),
    other => Err(Error::UnknownPrecedence(other.to_owned())),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawContact::from_row`].
pub const CONTACT_COLUMNS: &str =
  "id, email, phone, linked_id, precedence, created_at, updated_at, deleted_at";

/// Raw values read directly from a `contacts` row.
pub struct RawContact {
  pub id:         i64,
  pub email:      Option<String>,
  pub phone:      Option<String>,
  pub linked_id:  Option<i64>,
  pub precedence: String,
  pub created_at: String,
  pub updated_at: String,
  pub deleted_at: Option<String>,
}

impl RawContact {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      email:      row.get(1)?,
      phone:      row.get(2)?,
      linked_id:  row.get(3)?,
      precedence: row.get(4)?,
      created_at: row.get(5)?,
      updated_at: row.get(6)?,
      deleted_at: row.get(7)?,
    })
  }

  pub fn into_contact(self) -> Result<Contact> {
    Ok(Contact {
      id:         decode_id(self.id)?,
      email:      self.email,
      phone:      self.phone,
      linked_id:  self.linked_id.map(decode_id).transpose()?,
      precedence: decode_precedence(&self.precedence)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      deleted_at: self.deleted_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}
