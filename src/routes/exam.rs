use axum::{extract::State, response::IntoResponse, Json};
use validator::Validate;

use crate::{dto::generator_dto::GenerateExamRequest, error::Result, AppState};

#[utoipa::path(
    post,
    path = "/api/exams/generate",
    request_body = GenerateExamRequest,
    responses(
        (status = 200, description = "Exam generated and normalized", body = Json<GeneratedExam>),
        (status = 400, description = "Missing or unsupported parameters"),
        (status = 502, description = "Generator failed, timed out or returned a malformed payload")
    )
)]
#[axum::debug_handler]
pub async fn generate_exam(
    State(state): State<AppState>,
    Json(payload): Json<GenerateExamRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let exam = state.generator_service.generate(&payload).await?;
    Ok(Json(exam))
}
