use serde::{Deserialize, Serialize};
use validator::Validate;

/// Uniform view of a live session, returned by every session endpoint that
/// does not produce a result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub quiz_id: uuid::Uuid,
    pub quiz_title: String,
    pub phase: String,
    pub current_index: usize,
    pub total_questions: usize,
    pub answered_count: usize,
    pub remaining_seconds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SelectAnswerPayload {
    pub question_id: uuid::Uuid,
    #[validate(length(min = 1, message = "Answer must not be empty"))]
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub result_id: uuid::Uuid,
    pub quiz_id: uuid::Uuid,
    pub score: i32,
    pub max_score: i32,
    pub timed_out: bool,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
    pub message: String,
}
