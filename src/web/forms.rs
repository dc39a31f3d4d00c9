use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use crate::domain::form::Form;
use crate::domain::response::FormResponse;
use crate::error::AppError;
use crate::extract::ValidJson;
use crate::services::forms::{self, FormInput};
use crate::services::responses::{self, SubmitInput};
use crate::state::SharedState;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(detail).put(update).delete(remove))
        .route("/:id/responses", get(form_responses).post(submit))
        .route("/:id/export", get(export))
        .with_state(state)
}

/// Ids arrive as plain path strings; anything that is not a UUID cannot
/// name an existing form, so it resolves to NotFound rather than a parse
/// rejection.
fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("form"))
}

async fn list(State(state): State<SharedState>) -> Result<Json<Vec<Form>>, AppError> {
    Ok(Json(forms::list_forms(&state.pool).await?))
}

async fn detail(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Form>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(forms::get_form(&state.pool, id).await?))
}

async fn create(
    State(state): State<SharedState>,
    ValidJson(input): ValidJson<FormInput>,
) -> Result<(StatusCode, Json<Form>), AppError> {
    let form = forms::create_form(&state.pool, input).await?;
    Ok((StatusCode::CREATED, Json(form)))
}

async fn update(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    ValidJson(input): ValidJson<FormInput>,
) -> Result<Json<Form>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(forms::update_form(&state.pool, id, input).await?))
}

async fn remove(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = parse_id(&id)?;
    forms::delete_form(&state.pool, id).await?;
    Ok(Json(json!({ "message": "Form deleted" })))
}

async fn form_responses(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<FormResponse>>, AppError> {
    // Listing for an unknown or malformed id is an empty list, not an error.
    let Ok(id) = Uuid::parse_str(&id) else {
        return Ok(Json(vec![]));
    };
    Ok(Json(responses::list_form_responses(&state.pool, id).await?))
}

async fn submit(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    ValidJson(input): ValidJson<SubmitInput>,
) -> Result<(StatusCode, Json<FormResponse>), AppError> {
    let id = parse_id(&id)?;
    let response = responses::submit_response(&state.pool, id, input).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn export(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let (filename, csv) = responses::export_csv(&state.pool, id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv,
    ))
}
