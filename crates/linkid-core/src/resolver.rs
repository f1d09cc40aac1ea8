//! The identity resolver: decides whether a signal creates a contact, attaches
//! to an existing cluster, or merges two clusters.
//!
//! Every call runs as a single [`ContactStore::transact`] unit, so the reads,
//! the merge updates and the insert are atomic and serialised against
//! concurrent calls on the same store.

use std::{
  sync::{
    Arc,
    atomic::{AtomicU8, Ordering},
  },
  time::{Duration, Instant},
};

use tracing::{debug, info};

use crate::{
  Error, Result,
  contact::{Contact, ContactId, NewContact, Precedence, Signal},
  store::{ContactStore, ContactTx},
};

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
  /// Upper bound on one `identify` call, including time spent waiting for the
  /// store. A unit that has not decided to commit by then is rolled back and
  /// the call fails with [`Error::Timeout`]. A unit that already decided to
  /// commit is awaited and its result returned.
  pub timeout: Duration,
}

impl Default for ResolverConfig {
  fn default() -> Self { Self { timeout: Duration::from_secs(5) } }
}

// ─── Resolver ────────────────────────────────────────────────────────────────

pub struct Resolver<S> {
  store:  Arc<S>,
  config: ResolverConfig,
}

impl<S: ContactStore> Resolver<S> {
  pub fn new(store: Arc<S>, config: ResolverConfig) -> Self { Self { store, config } }

  /// Resolve `signal` to the full cluster it belongs to, creating or
  /// re-linking contacts as needed.
  ///
  /// The returned records are re-read from the store after any write, ordered
  /// by `(created_at, id)`.
  pub async fn identify(&self, signal: Signal) -> Result<Vec<Contact>> {
    let timeout = self.config.timeout;
    let deadline = Instant::now() + timeout;
    // Decided exactly once: either the unit claims it to commit, or the
    // caller claims it to give up.
    let verdict = Arc::new(AtomicU8::new(PENDING));

    let unit = self.store.transact({
      let verdict = Arc::clone(&verdict);
      move |tx| {
        let cluster = resolve(tx, &signal)?;
        if Instant::now() >= deadline || !claim(&verdict, COMMITTING) {
          return Err(Error::Timeout(timeout));
        }
        Ok(cluster)
      }
    });
    tokio::pin!(unit);

    let outcome =
      match tokio::time::timeout_at(tokio::time::Instant::from_std(deadline), unit.as_mut()).await {
        Ok(outcome) => outcome,
        Err(_elapsed) if claim(&verdict, ABANDONED) => return Err(Error::Timeout(timeout)),
        // The unit is already committing; its result is the answer.
        Err(_elapsed) => unit.await,
      };

    match outcome {
      Err(store_err) => Err(Error::store(store_err)),
      Ok(outcome) => outcome,
    }
  }
}

const PENDING: u8 = 0;
const COMMITTING: u8 = 1;
const ABANDONED: u8 = 2;

fn claim(verdict: &AtomicU8, to: u8) -> bool {
  verdict
    .compare_exchange(PENDING, to, Ordering::AcqRel, Ordering::Acquire)
    .is_ok()
}

// ─── Algorithm ───────────────────────────────────────────────────────────────

fn resolve<E>(tx: &mut dyn ContactTx<Error = E>, signal: &Signal) -> Result<Vec<Contact>>
where
  E: std::error::Error + Send + Sync + 'static,
{
  let by_email = match signal.email.as_deref() {
    Some(email) => tx.find_by_email(email).map_err(Error::store)?,
    None => None,
  };
  let by_phone = match signal.phone.as_deref() {
    Some(phone) => tx.find_by_phone(phone).map_err(Error::store)?,
    None => None,
  };

  match (by_email, by_phone) {
    (Some(e), Some(p)) if e.id == p.id => {
      let anchor = resolve_anchor(tx, &e)?;
      cluster(tx, anchor.id)
    }
    (Some(e), Some(p)) => merge(tx, &e, &p),
    (Some(matched), None) => attach(tx, signal, &matched, signal.phone.is_some()),
    (None, Some(matched)) => attach(tx, signal, &matched, signal.email.is_some()),
    (None, None) => {
      let created = tx.insert(NewContact::primary(signal)).map_err(Error::store)?;
      debug!(contact_id = created.id, "created primary contact");
      Ok(vec![created])
    }
  }
}

/// One channel matched an existing contact. If the other channel was
/// supplied, it is new information and is recorded as a secondary of the
/// matched cluster; otherwise the signal adds nothing and no row is written.
///
/// The second rule differs from always inserting a secondary for a
/// single-channel match: an email-only signal for a known email would only
/// add a duplicate row with no phone.
fn attach<E>(
  tx: &mut dyn ContactTx<Error = E>,
  signal: &Signal,
  matched: &Contact,
  carries_new_channel: bool,
) -> Result<Vec<Contact>>
where
  E: std::error::Error + Send + Sync + 'static,
{
  let anchor = resolve_anchor(tx, matched)?;
  if carries_new_channel {
    let created = tx
      .insert(NewContact::secondary(signal, anchor.id))
      .map_err(Error::store)?;
    debug!(contact_id = created.id, anchor_id = anchor.id, "created secondary contact");
  }
  cluster(tx, anchor.id)
}

/// The email and phone matched contacts in (possibly) different clusters.
/// The older anchor survives; the newer anchor and all of its secondaries are
/// re-pointed at it.
fn merge<E>(
  tx: &mut dyn ContactTx<Error = E>,
  by_email: &Contact,
  by_phone: &Contact,
) -> Result<Vec<Contact>>
where
  E: std::error::Error + Send + Sync + 'static,
{
  let email_anchor = resolve_anchor(tx, by_email)?;
  let phone_anchor = resolve_anchor(tx, by_phone)?;
  if email_anchor.id == phone_anchor.id {
    return cluster(tx, email_anchor.id);
  }

  let (older, newer) = if email_anchor.age_key() <= phone_anchor.age_key() {
    (email_anchor, phone_anchor)
  } else {
    (phone_anchor, email_anchor)
  };

  let absorbed = tx.find_cluster(newer.id).map_err(Error::store)?;
  demote(tx, &newer, older.id)?;
  for member in absorbed.iter().filter(|c| c.id != newer.id) {
    demote(tx, member, older.id)?;
  }

  info!(
    primary_id = older.id,
    demoted_id = newer.id,
    relinked = absorbed.len().saturating_sub(1),
    "bridging signal merged clusters"
  );

  cluster(tx, older.id)
}

/// Point `contact` at `anchor` as a secondary. No write if it already is.
fn demote<E>(tx: &mut dyn ContactTx<Error = E>, contact: &Contact, anchor: ContactId) -> Result<()>
where
  E: std::error::Error + Send + Sync + 'static,
{
  if contact.precedence == Precedence::Secondary && contact.linked_id == Some(anchor) {
    return Ok(());
  }
  let mut relinked = contact.clone();
  relinked.precedence = Precedence::Secondary;
  relinked.linked_id = Some(anchor);
  tx.update(&relinked).map_err(Error::store)?;
  Ok(())
}

/// Follow a contact to its cluster's primary, checking that the link lands on
/// a live primary in exactly one hop.
fn resolve_anchor<E>(tx: &mut dyn ContactTx<Error = E>, contact: &Contact) -> Result<Contact>
where
  E: std::error::Error + Send + Sync + 'static,
{
  let anchor_id = contact.anchor_id().ok_or_else(|| {
    Error::Inconsistent(format!("secondary contact {} has no linked_id", contact.id))
  })?;
  if contact.is_primary() {
    return Ok(contact.clone());
  }

  let anchor = tx.find_by_id(anchor_id).map_err(Error::store)?.ok_or_else(|| {
    Error::Inconsistent(format!(
      "contact {} links to missing contact {anchor_id}",
      contact.id
    ))
  })?;

  if !anchor.is_primary() {
    return Err(Error::Inconsistent(format!(
      "contact {} links to secondary contact {anchor_id}",
      contact.id
    )));
  }
  Ok(anchor)
}

fn cluster<E>(tx: &mut dyn ContactTx<Error = E>, primary_id: ContactId) -> Result<Vec<Contact>>
where
  E: std::error::Error + Send + Sync + 'static,
{
  let members = tx.find_cluster(primary_id).map_err(Error::store)?;
  if members.is_empty() {
    return Err(Error::Inconsistent(format!("cluster {primary_id} has no members")));
  }
  Ok(members)
}
