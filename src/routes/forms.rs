//! Form resource endpoints

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

use crate::models::{ApiError, Form, FormWrite, ValidationErrors};
use crate::{validate, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_forms).post(create_form))
        .route("/:id", get(get_form).put(replace_form))
}

/// List all forms
#[utoipa::path(
    get,
    path = "/forms",
    responses(
        (status = 200, description = "List of forms", body = [Form])
    ),
    tag = "forms"
)]
pub async fn list_forms(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Form>>, ApiError> {
    Ok(Json(state.store.list_forms()?))
}

/// Get form by ID
#[utoipa::path(
    get,
    path = "/forms/{id}",
    params(("id" = i64, Path, description = "Form ID")),
    responses(
        (status = 200, description = "Form with questions and choices", body = Form),
        (status = 404, description = "Form not found")
    ),
    tag = "forms"
)]
pub async fn get_form(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Form>, ApiError> {
    let form = state.store.get_form(id)?.ok_or(ApiError::NotFound)?;
    Ok(Json(form))
}

/// Create a form with its question/choice tree
#[utoipa::path(
    post,
    path = "/forms",
    request_body = FormWrite,
    responses(
        (status = 201, description = "Form created", body = Form),
        (status = 400, description = "Consistency rule failed", body = ValidationErrors)
    ),
    tag = "forms"
)]
pub async fn create_form(
    State(state): State<Arc<AppState>>,
    Json(input): Json<FormWrite>,
) -> Result<(StatusCode, Json<Form>), ApiError> {
    validate::validate_questions(&input.questions)?;
    let form = state.store.create_form(&input)?;
    Ok((StatusCode::CREATED, Json(form)))
}

/// Replace a form: all existing questions and choices are deleted and
/// recreated from the body, and the form's submissions are dropped with them.
#[utoipa::path(
    put,
    path = "/forms/{id}",
    params(("id" = i64, Path, description = "Form ID")),
    request_body = FormWrite,
    responses(
        (status = 200, description = "Form replaced", body = Form),
        (status = 400, description = "Consistency rule failed", body = ValidationErrors),
        (status = 404, description = "Form not found")
    ),
    tag = "forms"
)]
pub async fn replace_form(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(input): Json<FormWrite>,
) -> Result<Json<Form>, ApiError> {
    validate::validate_questions(&input.questions)?;
    let form = state
        .store
        .replace_form(id, &input)?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(form))
}
