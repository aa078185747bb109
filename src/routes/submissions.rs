//! Submission resource endpoints
//!
//! Writes are flat (`form_id` + answers): answers pair with the target
//! form's questions by position, so the client never names a question id.
//! Reads are denormalized and embed the full parent form.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

use crate::models::{ApiError, Submission, SubmissionWrite, ValidationErrors};
use crate::{validate, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_submissions).post(create_submission))
        .route("/:id", get(get_submission).put(replace_submission))
}

/// List all submissions
#[utoipa::path(
    get,
    path = "/submissions",
    responses(
        (status = 200, description = "List of submissions", body = [Submission])
    ),
    tag = "submissions"
)]
pub async fn list_submissions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Submission>>, ApiError> {
    Ok(Json(state.store.list_submissions()?))
}

/// Get submission by ID
#[utoipa::path(
    get,
    path = "/submissions/{id}",
    params(("id" = i64, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Submission with embedded form", body = Submission),
        (status = 404, description = "Submission not found")
    ),
    tag = "submissions"
)]
pub async fn get_submission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Submission>, ApiError> {
    let submission = state.store.get_submission(id)?.ok_or(ApiError::NotFound)?;
    Ok(Json(submission))
}

/// Create a submission against a form
#[utoipa::path(
    post,
    path = "/submissions",
    request_body = SubmissionWrite,
    responses(
        (status = 201, description = "Submission created", body = Submission),
        (status = 400, description = "Consistency rule failed", body = ValidationErrors),
        (status = 404, description = "Target form not found")
    ),
    tag = "submissions"
)]
pub async fn create_submission(
    State(state): State<Arc<AppState>>,
    Json(input): Json<SubmissionWrite>,
) -> Result<(StatusCode, Json<Submission>), ApiError> {
    let form_id = validate::require_form_id(input.form_id)?;
    let question_types = state
        .store
        .question_types(form_id)?
        .ok_or(ApiError::NotFound)?;
    validate::validate_answers(&input.answers, &question_types)?;
    let submission = state.store.create_submission(form_id, &input.answers)?;
    Ok((StatusCode::CREATED, Json(submission)))
}

/// Replace a submission's answers. The target form comes from the stored
/// submission; a `form_id` in the body is ignored.
#[utoipa::path(
    put,
    path = "/submissions/{id}",
    params(("id" = i64, Path, description = "Submission ID")),
    request_body = SubmissionWrite,
    responses(
        (status = 200, description = "Submission replaced", body = Submission),
        (status = 400, description = "Consistency rule failed", body = ValidationErrors),
        (status = 404, description = "Submission not found")
    ),
    tag = "submissions"
)]
pub async fn replace_submission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(input): Json<SubmissionWrite>,
) -> Result<Json<Submission>, ApiError> {
    let form_id = state
        .store
        .submission_form(id)?
        .ok_or(ApiError::NotFound)?;
    let question_types = state
        .store
        .question_types(form_id)?
        .ok_or(ApiError::NotFound)?;
    validate::validate_answers(&input.answers, &question_types)?;
    let submission = state
        .store
        .replace_submission(id, &input.answers)?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(submission))
}
