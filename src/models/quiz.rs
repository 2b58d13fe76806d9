use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::question::QuestionWithOptions;
use crate::models::quiz_attempt::AttemptWithAnswers;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
}

/// A quiz read back together with everything it owns.
///
/// Questions are ordered by position and their options by option index.
/// Attempts are ordered newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizGraph {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<QuestionWithOptions>,
    pub attempts: Vec<AttemptWithAnswers>,
}

impl QuizGraph {
    pub fn latest_attempt(&self) -> Option<&AttemptWithAnswers> {
        self.attempts.first()
    }
}
