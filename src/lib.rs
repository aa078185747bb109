//! Forms API
//!
//! REST backend for building forms and collecting submissions.
//!
//! A form owns an ordered list of questions (textbox, radio, checkbox);
//! radio and checkbox questions own an ordered list of choices. A submission
//! holds one answer per question of its form, paired by position. Updates are
//! full replacements: replacing a form rebuilds its whole question tree,
//! replacing a submission rebuilds its whole answer list.
//!
//! ```text
//! client payload ──▶ validate ──▶ aggregate builders ──▶ SQLite ──▶ JSON
//! ```

#![warn(missing_docs)]
#![allow(dead_code)]

pub mod models;
pub mod routes;
pub mod store;
pub mod validate;

use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use models::*;

use store::SqliteStore;

/// Shared API state
pub struct AppState {
    /// Backing store; one connection guarded by a mutex.
    pub store: SqliteStore,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Forms API",
        version = "1.0.0",
        description = "Forms and submissions backend"
    ),
    paths(
        routes::health::health_check,
        routes::forms::list_forms,
        routes::forms::get_form,
        routes::forms::create_form,
        routes::forms::replace_form,
        routes::submissions::list_submissions,
        routes::submissions::get_submission,
        routes::submissions::create_submission,
        routes::submissions::replace_submission,
    ),
    components(
        schemas(
            Form, Question, Choice, QuestionType,
            FormWrite, QuestionWrite, ChoiceWrite,
            Submission, Answer, SubmissionWrite, AnswerWrite,
            ValidationErrors, DetailBody,
            routes::health::HealthResponse
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "forms", description = "Form management"),
        (name = "submissions", description = "Submission collection")
    )
)]
pub struct ApiDoc;

/// Build the API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(routes::health::health_check))
        .nest("/forms", routes::forms::router())
        .nest("/submissions", routes::submissions::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
