//! Router tests against a [`MemoryStore`].

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use linkid_core::{
  memory::{FailPoint, MemoryStore},
  resolver::{Resolver, ResolverConfig},
};
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::api_router;

fn app(store: &MemoryStore) -> Router {
  api_router(Arc::new(Resolver::new(
    Arc::new(store.clone()),
    ResolverConfig::default(),
  )))
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
  let resp = app.oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn identify(body: Value) -> Request<Body> {
  Request::builder()
    .method("POST")
    .uri("/identify")
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from(body.to_string()))
    .unwrap()
}

// ─── Identify ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_signal_creates_primary() {
  let store = MemoryStore::new();
  let (status, body) = call(
    app(&store),
    identify(json!({ "email": "a@x.com", "phone": "+16502530000" })),
  )
  .await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(
    body,
    json!({
      "primaryContactId": 1,
      "emails": ["a@x.com"],
      "phoneNumbers": ["+16502530000"],
      "secondaryContactIds": []
    })
  );
}

#[tokio::test]
async fn phone_is_normalised_and_alias_accepted() {
  let store = MemoryStore::new();
  call(app(&store), identify(json!({ "email": "a@x.com", "phone": "+16502530000" }))).await;

  // Same number, different formatting, via the `phoneNumber` key.
  let (status, body) = call(
    app(&store),
    identify(json!({ "email": "b@x.com", "phoneNumber": "+1 (650) 253-0000" })),
  )
  .await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["primaryContactId"], 1);
  assert_eq!(body["emails"], json!(["a@x.com", "b@x.com"]));
  assert_eq!(body["phoneNumbers"], json!(["+16502530000"]));
  assert_eq!(body["secondaryContactIds"], json!([2]));
}

#[tokio::test]
async fn null_and_blank_fields_are_absent() {
  let store = MemoryStore::new();
  call(app(&store), identify(json!({ "email": "a@x.com", "phone": "+16502530000" }))).await;

  let (status, body) = call(app(&store), identify(json!({ "email": null, "phone": "+16502530000" }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["primaryContactId"], 1);

  let (status, _) = call(app(&store), identify(json!({ "email": "  ", "phone": "+16502530000" }))).await;
  assert_eq!(status, StatusCode::OK);

  assert_eq!(store.snapshot().await.len(), 1);
}

#[tokio::test]
async fn bridging_signal_merges_clusters() {
  let store = MemoryStore::new();
  call(app(&store), identify(json!({ "email": "a@x.com", "phone": "+16502530000" }))).await;
  call(app(&store), identify(json!({ "email": "b@x.com", "phone": "+442070313000" }))).await;

  let (status, body) = call(
    app(&store),
    identify(json!({ "email": "b@x.com", "phone": "+16502530000" })),
  )
  .await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(
    body,
    json!({
      "primaryContactId": 1,
      "emails": ["a@x.com", "b@x.com"],
      "phoneNumbers": ["+16502530000", "+442070313000"],
      "secondaryContactIds": [2]
    })
  );
}

// ─── Rejections ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_both_channels_is_bad_request() {
  let store = MemoryStore::new();
  for body in [json!({}), json!({ "email": null, "phone": null }), json!({ "email": "", "phone": " " })] {
    let (status, resp) = call(app(&store), identify(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["error"].is_string());
  }
  assert!(store.snapshot().await.is_empty());
}

#[tokio::test]
async fn invalid_values_are_bad_request() {
  let store = MemoryStore::new();
  let (status, _) = call(app(&store), identify(json!({ "email": "not-an-email" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call(app(&store), identify(json!({ "phone": "6502530000" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  assert!(store.snapshot().await.is_empty());
}

#[tokio::test]
async fn malformed_json_is_rejected() {
  let store = MemoryStore::new();
  let req = Request::builder()
    .method("POST")
    .uri("/identify")
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from("{\"email\":"))
    .unwrap();
  let (status, _) = call(app(&store), req).await;
  assert!(status.is_client_error());
}

#[tokio::test]
async fn store_failure_is_opaque_internal_error() {
  let store = MemoryStore::new();
  store.fail_at(Some(FailPoint::Transact)).await;

  let (status, body) = call(app(&store), identify(json!({ "email": "a@x.com" }))).await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(body, json!({ "error": "internal error" }));
}

// ─── Health ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_endpoints() {
  let store = MemoryStore::new();
  for uri in ["/health/check", "/"] {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, body) = call(app(&store), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "success" }));
  }
}
