//! Handler for `POST /identify`.

use std::sync::Arc;

use axum::{Json, extract::State};
use linkid_core::{resolver::Resolver, store::ContactStore, view::ClusterView};
use serde::Deserialize;

use crate::{error::ApiError, validate};

#[derive(Debug, Default, Deserialize)]
pub struct IdentifyBody {
  pub email: Option<String>,
  #[serde(alias = "phoneNumber")]
  pub phone: Option<String>,
}

/// `POST /identify` — body: `{"email":"a@x.com","phone":"+16502530000"}`
///
/// Either field may be omitted or `null`, but not both.
pub async fn handler<S>(
  State(resolver): State<Arc<Resolver<S>>>,
  Json(body): Json<IdentifyBody>,
) -> Result<Json<ClusterView>, ApiError>
where
  S: ContactStore + 'static,
{
  let signal = validate::signal(body.email.as_deref(), body.phone.as_deref())?;
  let cluster = resolver.identify(signal).await?;
  Ok(Json(ClusterView::assemble(&cluster)?))
}
