pub mod exam;
pub mod health;
pub mod quiz;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/exams/generate", post(exam::generate_exam))
        .route("/api/quizzes", post(quiz::create_quiz))
        .route("/api/quizzes/grade", post(quiz::grade_quiz))
        .route("/api/quizzes/save", post(quiz::save_quiz))
        .route("/api/quizzes/:id", get(quiz::get_quiz).delete(quiz::delete_quiz))
        .route("/api/quizzes/:id/details", get(quiz::quiz_details))
        .route("/api/users/:user_id/quizzes", get(quiz::list_user_quizzes))
        .with_state(state)
}
