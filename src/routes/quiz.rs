use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::quiz_dto::{CreateQuizRequest, GradeQuizRequest, SaveQuizRequest},
    error::Result,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/quizzes/grade",
    request_body = GradeQuizRequest,
    responses(
        (status = 200, description = "Session graded, nothing persisted", body = Json<GradeReport>),
        (status = 400, description = "Unknown question or option out of range")
    )
)]
#[axum::debug_handler]
pub async fn grade_quiz(
    State(state): State<AppState>,
    Json(payload): Json<GradeQuizRequest>,
) -> Result<impl IntoResponse> {
    let report = state.quiz_service.grade_preview(&payload)?;
    Ok(Json(report))
}

#[utoipa::path(
    post,
    path = "/api/quizzes/save",
    request_body = SaveQuizRequest,
    responses(
        (status = 201, description = "Quiz and attempt saved", body = Json<SaveQuizResponse>),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Quiz saved but attempt failed, body carries quizId")
    )
)]
#[axum::debug_handler]
pub async fn save_quiz(
    State(state): State<AppState>,
    Json(payload): Json<SaveQuizRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let saved = state.quiz_service.save(payload).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

#[utoipa::path(
    post,
    path = "/api/quizzes",
    request_body = CreateQuizRequest,
    responses(
        (status = 201, description = "Empty quiz created", body = Json<CreateQuizResponse>),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
pub async fn create_quiz(
    State(state): State<AppState>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let created = state.quiz_service.create_quiz_shell(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/quizzes/{id}",
    params(
        ("id" = Uuid, Path, description = "Quiz ID")
    ),
    responses(
        (status = 200, description = "Quiz with questions, options and attempts", body = Json<QuizGraph>),
        (status = 404, description = "Quiz not found")
    )
)]
#[axum::debug_handler]
pub async fn get_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let quiz = state.quiz_service.get_quiz(id).await?;
    Ok(Json(quiz))
}

#[utoipa::path(
    get,
    path = "/api/quizzes/{id}/details",
    params(
        ("id" = Uuid, Path, description = "Quiz ID")
    ),
    responses(
        (status = 200, description = "Quiz report built from the latest attempt", body = Json<QuizReport>),
        (status = 404, description = "Quiz not found")
    )
)]
#[axum::debug_handler]
pub async fn quiz_details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let report = state.history_service.details(id).await?;
    Ok(Json(report))
}

#[utoipa::path(
    delete,
    path = "/api/quizzes/{id}",
    params(
        ("id" = Uuid, Path, description = "Quiz ID")
    ),
    responses(
        (status = 204, description = "Quiz and everything it owns deleted"),
        (status = 404, description = "Quiz not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.quiz_service.delete_quiz(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}/quizzes",
    params(
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Quizzes of the user, newest first", body = Json<Vec<UserQuizView>>),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
pub async fn list_user_quizzes(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let quizzes = state.quiz_service.list_user_quizzes(user_id).await?;
    Ok(Json(quizzes))
}
