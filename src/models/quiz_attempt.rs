use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::user_answer::UserAnswer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub score: Option<Decimal>,
    pub passed: bool,
    pub attempt_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptWithAnswers {
    #[serde(flatten)]
    pub attempt: QuizAttempt,
    pub answers: Vec<UserAnswer>,
}
