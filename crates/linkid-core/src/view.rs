//! [`ClusterView`] — the externally visible shape of an identity cluster.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  contact::{Contact, ContactId},
};

/// The consolidated identity of one cluster, computed on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterView {
  pub primary_contact_id:    ContactId,
  /// Primary's email first (when it has one), then the distinct emails of the
  /// secondaries in the order given.
  pub emails:                Vec<String>,
  /// Same layout as `emails`.
  pub phone_numbers:         Vec<String>,
  pub secondary_contact_ids: Vec<ContactId>,
}

impl ClusterView {
  /// Assemble the view for `contacts`, which must hold exactly one primary.
  pub fn assemble(contacts: &[Contact]) -> Result<Self> {
    let mut primaries = contacts.iter().filter(|c| c.is_primary());
    let primary = primaries
      .next()
      .ok_or_else(|| Error::Inconsistent("cluster has no primary contact".into()))?;
    if let Some(other) = primaries.next() {
      return Err(Error::Inconsistent(format!(
        "cluster has several primary contacts: {} and {}",
        primary.id, other.id
      )));
    }

    let secondaries: Vec<&Contact> = contacts.iter().filter(|c| !c.is_primary()).collect();

    Ok(Self {
      primary_contact_id:    primary.id,
      emails:                channel_values(primary, &secondaries, |c| c.email.as_deref()),
      phone_numbers:         channel_values(primary, &secondaries, |c| c.phone.as_deref()),
      secondary_contact_ids: secondaries.iter().map(|c| c.id).collect(),
    })
  }
}

fn channel_values<'a>(
  primary: &'a Contact,
  secondaries: &[&'a Contact],
  channel: impl Fn(&'a Contact) -> Option<&'a str>,
) -> Vec<String> {
  let mut values: Vec<String> = channel(primary).into_iter().map(str::to_owned).collect();
  for value in secondaries.iter().filter_map(|c| channel(*c)) {
    if !values.iter().any(|v| v == value) {
      values.push(value.to_owned());
    }
  }
  values
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};

  use super::*;
  use crate::contact::Precedence;

  fn contact(
    id: ContactId,
    email: Option<&str>,
    phone: Option<&str>,
    linked_id: Option<ContactId>,
  ) -> Contact {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, id as u32).unwrap();
    Contact {
      id,
      email: email.map(str::to_owned),
      phone: phone.map(str::to_owned),
      linked_id,
      precedence: if linked_id.is_some() { Precedence::Secondary } else { Precedence::Primary },
      created_at: at,
      updated_at: at,
      deleted_at: None,
    }
  }

  #[test]
  fn single_primary() {
    let view = ClusterView::assemble(&[contact(1, Some("a@x.com"), Some("111"), None)]).unwrap();
    assert_eq!(view.primary_contact_id, 1);
    assert_eq!(view.emails, ["a@x.com"]);
    assert_eq!(view.phone_numbers, ["111"]);
    assert!(view.secondary_contact_ids.is_empty());
  }

  #[test]
  fn primary_values_come_first_and_duplicates_collapse() {
    // Secondary listed before the primary on purpose.
    let view = ClusterView::assemble(&[
      contact(3, Some("b@x.com"), Some("111"), Some(1)),
      contact(1, Some("a@x.com"), Some("111"), None),
      contact(2, Some("a@x.com"), Some("222"), Some(1)),
      contact(4, Some("b@x.com"), Some("222"), Some(1)),
    ])
    .unwrap();

    assert_eq!(view.primary_contact_id, 1);
    assert_eq!(view.emails, ["a@x.com", "b@x.com"]);
    assert_eq!(view.phone_numbers, ["111", "222"]);
    assert_eq!(view.secondary_contact_ids, [3, 2, 4]);
  }

  #[test]
  fn absent_primary_channel_is_omitted() {
    let view = ClusterView::assemble(&[
      contact(1, None, Some("111"), None),
      contact(2, Some("a@x.com"), Some("111"), Some(1)),
    ])
    .unwrap();
    assert_eq!(view.emails, ["a@x.com"]);
    assert_eq!(view.phone_numbers, ["111"]);
  }

  #[test]
  fn missing_primary_is_inconsistent() {
    let err = ClusterView::assemble(&[contact(2, Some("a@x.com"), None, Some(1))]).unwrap_err();
    assert!(matches!(err, Error::Inconsistent(_)));
  }

  #[test]
  fn two_primaries_are_inconsistent() {
    let err = ClusterView::assemble(&[
      contact(1, Some("a@x.com"), None, None),
      contact(2, Some("b@x.com"), None, None),
    ])
    .unwrap_err();
    assert!(matches!(err, Error::Inconsistent(_)));
  }

  #[test]
  fn serialises_with_camel_case_keys() {
    let view = ClusterView::assemble(&[contact(1, Some("a@x.com"), Some("111"), None)]).unwrap();
    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(
      json,
      serde_json::json!({
        "primaryContactId": 1,
        "emails": ["a@x.com"],
        "phoneNumbers": ["111"],
        "secondaryContactIds": []
      })
    );
  }
}
