use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuizOption {
    pub id: Uuid,
    pub question_id: Uuid,
    pub option_text: String,
    pub option_index: i32,
}
