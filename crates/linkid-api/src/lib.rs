//! JSON HTTP boundary for linkid.
//!
//! Exposes an axum [`Router`] that drives a [`Resolver`] over any
//! [`ContactStore`]. TLS, auth and request tracing are the caller's
//! responsibility.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/identify` | Body: `{"email":"a@x.com","phone":"+16502530000"}` |
//! | `GET`  | `/health/check` | Liveness |
//! | `GET`  | `/` | Same as `/health/check` |

pub mod error;
pub mod health;
pub mod identify;
pub mod validate;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use linkid_core::{resolver::Resolver, store::ContactStore};

pub use error::ApiError;

/// Build a fully-materialised router for `resolver`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(resolver: Arc<Resolver<S>>) -> Router<()>
where
  S: ContactStore + 'static,
{
  Router::new()
    .route("/identify", post(identify::handler::<S>))
    .route("/health/check", get(health::handler))
    .route("/", get(health::handler))
    .with_state(resolver)
}

#[cfg(test)]
mod tests;
