use axum::{extract::State, routing::get, Json, Router};

use crate::domain::response::ResponseWithForm;
use crate::error::AppError;
use crate::services::responses;
use crate::state::SharedState;

pub fn router(state: SharedState) -> Router {
    Router::new().route("/", get(list_all)).with_state(state)
}

async fn list_all(
    State(state): State<SharedState>,
) -> Result<Json<Vec<ResponseWithForm>>, AppError> {
    Ok(Json(responses::list_all_responses(&state.pool).await?))
}
