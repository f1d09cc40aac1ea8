//! Request validation: turns raw body fields into a normalised [`Signal`].
//!
//! Emails are checked against an addr-spec shaped pattern and kept as given.
//! Phone numbers must carry a `+` country code, be valid for their region and
//! are normalised to E.164, so `+1 (650) 253-0000` and `+16502530000` match
//! the same contacts.

use std::sync::LazyLock;

use linkid_core::contact::Signal;
use phonenumber::Mode;
use regex::Regex;

use crate::error::ApiError;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
    .unwrap()
});

/// Build a signal from the optional `email` and `phone` fields.
///
/// Blank values count as absent. At least one channel must remain.
pub fn signal(email: Option<&str>, phone: Option<&str>) -> Result<Signal, ApiError> {
  let email = present(email).map(self::email).transpose()?;
  let phone = present(phone).map(self::phone).transpose()?;
  if email.is_none() && phone.is_none() {
    return Err(ApiError::Validation("either email or phone is required".into()));
  }
  Ok(Signal::new(email, phone))
}

pub fn email(raw: &str) -> Result<String, ApiError> {
  if EMAIL_RE.is_match(raw) {
    Ok(raw.to_owned())
  } else {
    Err(ApiError::Validation(format!("invalid email address: {raw}")))
  }
}

/// Parse `raw` as an international number and return its E.164 form.
pub fn phone(raw: &str) -> Result<String, ApiError> {
  let number = phonenumber::parse(None, raw)
    .map_err(|e| ApiError::Validation(format!("invalid phone number {raw}: {e}")))?;
  if !phonenumber::is_valid(&number) {
    return Err(ApiError::Validation(format!("invalid phone number: {raw}")));
  }
  Ok(number.format().mode(Mode::E164).to_string())
}

fn present(value: Option<&str>) -> Option<&str> {
  value.map(str::trim).filter(|v| !v.is_empty())
}
