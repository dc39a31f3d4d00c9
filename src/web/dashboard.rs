use axum::{extract::State, routing::get, Json, Router};

use crate::domain::response::DashboardStats;
use crate::error::AppError;
use crate::services::responses;
use crate::state::SharedState;

pub fn router(state: SharedState) -> Router {
    Router::new().route("/stats", get(stats)).with_state(state)
}

async fn stats(State(state): State<SharedState>) -> Result<Json<DashboardStats>, AppError> {
    Ok(Json(responses::dashboard_stats(&state.pool).await?))
}
