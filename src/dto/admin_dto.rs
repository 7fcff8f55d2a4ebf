use crate::dto::auth_dto::UserResponse;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateQuizPayload {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: String,
    pub description: Option<String>,
    #[validate(range(min = 1, message = "Time limit must be at least 1 minute"))]
    pub time_limit_minutes: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuizPayload {
    #[serde(default, deserialize_with = "trim_optional_string")]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub description: Option<String>,

    #[validate(range(min = 1, message = "Time limit must be at least 1 minute"))]
    pub time_limit_minutes: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishQuizPayload {
    pub publish: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateQuestionPayload {
    pub quiz_id: uuid::Uuid,
    #[validate(length(min = 1, message = "Question text must not be empty"))]
    pub question_text: String,
    #[validate(length(min = 2, max = 4, message = "A question needs 2-4 options"))]
    pub options: Vec<String>,
    #[validate(length(min = 1, message = "Correct answer must not be empty"))]
    pub correct_answer: String,
    #[validate(range(min = 1, message = "Points must be at least 1"))]
    pub points: i32,
    pub question_type: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionPayload {
    #[serde(default, deserialize_with = "trim_optional_string")]
    pub question_text: Option<String>,

    #[validate(length(min = 2, max = 4, message = "A question needs 2-4 options"))]
    pub options: Option<Vec<String>>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub correct_answer: Option<String>,

    #[validate(range(min = 1, message = "Points must be at least 1"))]
    pub points: Option<i32>,

    pub question_type: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserPayload {
    #[serde(default, deserialize_with = "trim_optional_string")]
    pub username: Option<String>,

    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUserStatusPayload {
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_quizzes: i64,
    pub published_quizzes: i64,
    pub total_results: i64,
}

// Custom deserializer to trim strings and convert empty strings to None
fn trim_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}
