use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row of the caller's result history, joined with the quiz title.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResultSummary {
    pub id: uuid::Uuid,
    pub quiz_id: uuid::Uuid,
    pub quiz_title: String,
    pub score: i32,
    pub max_score: i32,
    pub timed_out: bool,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}
