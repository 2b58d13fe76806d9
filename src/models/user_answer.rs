use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One answered question of an attempt.
///
/// `user_response` holds the chosen option index encoded as a string, see
/// `grading_service::encode_response`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserAnswer {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    pub user_response: String,
    pub is_correct: bool,
}
