use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuizResult {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub user_id: Uuid,
    pub answers: JsonValue,
    pub score: i32,
    pub max_score: i32,
    pub timed_out: bool,
    pub submitted_at: DateTime<Utc>,
}
