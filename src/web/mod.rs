pub mod dashboard;
pub mod forms;
pub mod responses;

use axum::{routing::get, Json, Router};
use chrono::Utc;
use serde_json::json;

use crate::state::SharedState;

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "timestamp": Utc::now() }))
}

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/forms", forms::router(state.clone()))
        .nest("/responses", responses::router(state.clone()))
        .nest("/dashboard", dashboard::router(state))
}
