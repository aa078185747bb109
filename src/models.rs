//! API Models
//!
//! Read shapes mirror what the API serves; write shapes mirror what clients
//! send. They differ for submissions, which are written flat (`form_id` +
//! answers) but read denormalized (embedded form, resolved question ids).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::store::StoreError;
use crate::validate::ValidationError;

/// Question type tag. Serialized lowercase on the wire and in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Textbox,
    Radio,
    Checkbox,
}

impl QuestionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Textbox => "textbox",
            Self::Radio => "radio",
            Self::Checkbox => "checkbox",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "textbox" => Some(Self::Textbox),
            "radio" => Some(Self::Radio),
            "checkbox" => Some(Self::Checkbox),
            _ => None,
        }
    }

    /// Whether this type carries a choice list.
    pub fn supports_choices(self) -> bool {
        matches!(self, Self::Radio | Self::Checkbox)
    }
}

// ============ Forms (read) ============

/// Form with its full question/choice tree
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Form {
    pub id: i64,
    pub title: String,
    pub questions: Vec<Question>,
}

/// Question within a form
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Question {
    pub id: i64,
    pub display_order: i64,
    pub question: String,
    pub question_type: QuestionType,
    pub choices: Vec<Choice>,
}

/// Selectable option of a radio/checkbox question
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Choice {
    pub id: i64,
    pub choice: String,
    pub choice_id: i64,
}

// ============ Forms (write) ============

/// Form creation/replacement request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FormWrite {
    pub title: String,
    pub questions: Vec<QuestionWrite>,
}

/// Question payload within a form write
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuestionWrite {
    pub display_order: i64,
    pub question: String,
    pub question_type: QuestionType,
    /// Absent for textbox questions
    #[serde(default)]
    pub choices: Vec<ChoiceWrite>,
}

/// Choice payload within a question write
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChoiceWrite {
    pub choice_id: i64,
    pub choice: String,
}

// ============ Submissions (read) ============

/// Submission with its parent form embedded.
///
/// The embedded form is serialized under the `form_id` key, matching the
/// original wire contract.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Submission {
    pub id: i64,
    pub form_id: Form,
    pub answers: Vec<Answer>,
}

/// Answer with its resolved question id and type
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Answer {
    pub id: i64,
    pub answer: String,
    pub question_id: i64,
    pub question_type: QuestionType,
}

// ============ Submissions (write) ============

/// Submission creation/replacement request.
///
/// `form_id` is required on create and ignored on replace: a submission never
/// moves to a different form.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmissionWrite {
    pub form_id: Option<i64>,
    pub answers: Vec<AnswerWrite>,
}

/// Answer payload. `question_type` is checked against the question at the
/// same position, then discarded; it is never persisted. It stays a free
/// string here so an unknown tag surfaces as a validation message rather than
/// a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnswerWrite {
    pub answer: String,
    pub question_type: String,
}

// ============ Errors ============

/// Body of a 400 consistency-rule failure
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidationErrors {
    pub non_field_errors: Vec<String>,
}

/// Body of a 404 or 500 response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DetailBody {
    pub detail: String,
}

/// Handler-level error, mapped onto HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(err) => (
                StatusCode::BAD_REQUEST,
                Json(ValidationErrors {
                    non_field_errors: vec![err.to_string()],
                }),
            )
                .into_response(),
            Self::NotFound => (
                StatusCode::NOT_FOUND,
                Json(DetailBody {
                    detail: "Not found.".into(),
                }),
            )
                .into_response(),
            Self::Store(err) => {
                tracing::error!("store error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(DetailBody {
                        detail: "Internal server error.".into(),
                    }),
                )
                    .into_response()
            }
        }
    }
}
