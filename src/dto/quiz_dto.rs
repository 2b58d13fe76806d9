use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::dto::generator_dto::{FlexibleText, RawGeneratedQuestion};
use crate::models::question::Question;
use crate::models::quiz_attempt::QuizAttempt;
use crate::models::quiz_option::QuizOption;
use crate::models::session::SessionQuestion;

/// A question handed back by the client, either as the generator produced it
/// or as the normalized session question the client was shown.
///
/// Any object carrying a `status` key is a session question. One that does not
/// parse as such lands in `MalformedSession` instead of being read as raw
/// generator output.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum QuizQuestionInput {
    Session(SessionQuestion),
    MalformedSession(TaggedQuestion),
    Raw(RawGeneratedQuestion),
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaggedQuestion {
    pub status: serde_json::Value,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl TaggedQuestion {
    /// Parses the object again as a session question to surface why it was rejected.
    pub fn parse(&self) -> Result<SessionQuestion, serde_json::Error> {
        let mut object = self.fields.clone();
        object.insert("status".to_string(), self.status.clone());
        serde_json::from_value(serde_json::Value::Object(object))
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuizDataInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    pub questions: Vec<QuizQuestionInput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnswerInput {
    /// Session sequence number of the answered question.
    pub question_id: u32,
    pub user_response: FlexibleText,
    #[serde(default)]
    pub is_correct: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaveQuizRequest {
    #[validate(nested)]
    pub quiz_data: QuizDataInput,
    pub user_id: Uuid,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 100.0, message = "score must be between 0 and 100"))]
    pub score: Option<f64>,
    #[serde(default)]
    pub passed: Option<bool>,
    pub user_answers: Vec<UserAnswerInput>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveQuizResponse {
    pub message: String,
    pub quiz_id: Uuid,
    pub attempt_id: Uuid,
    pub attempt: QuizAttempt,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeQuizRequest {
    pub questions: Vec<QuizQuestionInput>,
    #[serde(default)]
    pub user_answers: Vec<UserAnswerInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "prompt is required"))]
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizResponse {
    pub message: String,
    pub quiz_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizReport {
    pub quiz_id: Uuid,
    pub title: String,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
    pub attempt_id: Option<Uuid>,
    pub attempt_date: Option<DateTime<Utc>>,
    pub score: Option<f64>,
    pub passed: bool,
    pub questions: Vec<ReportQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuestion {
    pub question_id: Uuid,
    pub question_text: String,
    pub correct_answer: String,
    pub explanation: String,
    pub user_response: String,
    pub is_correct: bool,
    pub options: Vec<ReportOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportOption {
    pub option_text: String,
    pub option_index: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuizView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
    pub questions: Vec<Question>,
    pub attempts: Vec<AttemptSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSummary {
    pub id: Uuid,
    pub score: Option<f64>,
    pub passed: bool,
    pub attempt_date: DateTime<Utc>,
    pub answers: Vec<AnswerSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSummary {
    pub is_correct: bool,
    pub user_response: String,
    pub question: QuestionSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSummary {
    pub question_text: String,
    pub question_type: String,
    pub correct_option: i32,
    pub options: Vec<QuizOption>,
}
