use axum::Json;
use serde_json::{Value, json};

/// `GET /health/check` and `GET /`
pub async fn handler() -> Json<Value> { Json(json!({ "status": "success" })) }
