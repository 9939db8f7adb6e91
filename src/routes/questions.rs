use axum::{Json, Router, extract::State, routing::post};
use axum_valid::Valid;

use crate::{
    dto::questions::{
        GenerateQuestionsRequest, GeneratedQuestions, RegenerateQuestionRequest,
        RegenerateQuestionResponse,
    },
    error::AppError,
    services::question_service,
    state::SharedState,
};

/// Question generation routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/questions/generate", post(generate_questions))
        .route("/api/questions/regenerate", post(regenerate_question))
}

/// Generate content for the requested round types.
#[utoipa::path(
    post,
    path = "/api/questions/generate",
    tag = "questions",
    request_body = GenerateQuestionsRequest,
    responses(
        (status = 200, description = "Generated content", body = GeneratedQuestions),
        (status = 502, description = "Text generation service failed")
    )
)]
pub async fn generate_questions(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<GenerateQuestionsRequest>>,
) -> Result<Json<GeneratedQuestions>, AppError> {
    Ok(Json(
        question_service::generate_questions(&state, payload).await?,
    ))
}

/// Replace a single generated item.
#[utoipa::path(
    post,
    path = "/api/questions/regenerate",
    tag = "questions",
    request_body = RegenerateQuestionRequest,
    responses(
        (status = 200, description = "Replacement item", body = RegenerateQuestionResponse),
        (status = 400, description = "Unsupported round type"),
        (status = 502, description = "Text generation service failed")
    )
)]
pub async fn regenerate_question(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<RegenerateQuestionRequest>>,
) -> Result<Json<RegenerateQuestionResponse>, AppError> {
    Ok(Json(
        question_service::regenerate_question(&state, payload).await?,
    ))
}
