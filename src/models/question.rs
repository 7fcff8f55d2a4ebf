use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub question_text: String,
    pub options: JsonValue,
    pub correct_answer: String,
    pub points: i32,
    pub question_type: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

impl Question {
    /// Ordered option list as stored in the jsonb column.
    pub fn options_vec(&self) -> Vec<String> {
        serde_json::from_value(self.options.clone()).unwrap_or_default()
    }
}
