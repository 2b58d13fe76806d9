use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::quiz_option::QuizOption;

/// A persisted multiple choice question.
///
/// `correct_option` is the 1-based `option_index` of the right option, never an
/// option id. `position` is the session sequence number the question carried
/// while it was being answered, so it doubles as the display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub position: i32,
    pub question_text: String,
    pub question_type: String,
    pub correct_option: i32,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionWithOptions {
    #[serde(flatten)]
    pub question: Question,
    pub options: Vec<QuizOption>,
}

impl QuestionWithOptions {
    pub fn option_at(&self, option_index: i32) -> Option<&QuizOption> {
        self.options.iter().find(|o| o.option_index == option_index)
    }
}
