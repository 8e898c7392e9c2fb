use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health-checks/ping", get(ping))
}

async fn ping() -> Json<Value> {
    Json(json!({ "success": "OK" }))
}
