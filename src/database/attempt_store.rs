use crate::error::Result;
use crate::models::question::Question;
use crate::models::quiz::Quiz;
use crate::models::result::QuizResult;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

/// Row to persist when an attempt submits.
#[derive(Debug, Clone)]
pub struct NewResult {
    pub quiz_id: Uuid,
    pub user_id: Uuid,
    pub answers: JsonValue,
    pub score: i32,
    pub max_score: i32,
    pub timed_out: bool,
}

/// What the insert did. `Duplicate` means a result for this (user, quiz)
/// pair already existed; the store never overwrites it.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    Created(QuizResult),
    Duplicate,
}

/// Storage the attempt lifecycle needs. Narrow on purpose so the whole
/// session flow can run against an in-memory implementation in tests.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn load_quiz(&self, quiz_id: Uuid) -> Result<Option<(Quiz, Vec<Question>)>>;
    async fn find_result(&self, user_id: Uuid, quiz_id: Uuid) -> Result<Option<QuizResult>>;
    async fn insert_result(&self, result: NewResult) -> Result<SubmitOutcome>;
}

pub struct PgAttemptStore {
    pool: PgPool,
}

impl PgAttemptStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttemptStore for PgAttemptStore {
    async fn load_quiz(&self, quiz_id: Uuid) -> Result<Option<(Quiz, Vec<Question>)>> {
        let quiz = sqlx::query_as::<_, Quiz>(r#"SELECT * FROM quizzes WHERE id = $1"#)
            .bind(quiz_id)
            .fetch_optional(&self.pool)
            .await?;

        let quiz = match quiz {
            Some(quiz) => quiz,
            None => return Ok(None),
        };

        let questions = sqlx::query_as::<_, Question>(
            r#"SELECT * FROM questions WHERE quiz_id = $1 ORDER BY position, created_at"#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some((quiz, questions)))
    }

    async fn find_result(&self, user_id: Uuid, quiz_id: Uuid) -> Result<Option<QuizResult>> {
        let result = sqlx::query_as::<_, QuizResult>(
            r#"SELECT * FROM results WHERE user_id = $1 AND quiz_id = $2"#,
        )
        .bind(user_id)
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(result)
    }

    async fn insert_result(&self, result: NewResult) -> Result<SubmitOutcome> {
        let inserted = sqlx::query_as::<_, QuizResult>(
            r#"
            INSERT INTO results (quiz_id, user_id, answers, score, max_score, timed_out)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, quiz_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(result.quiz_id)
        .bind(result.user_id)
        .bind(result.answers)
        .bind(result.score)
        .bind(result.max_score)
        .bind(result.timed_out)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(row) => Ok(SubmitOutcome::Created(row)),
            None => Ok(SubmitOutcome::Duplicate),
        }
    }
}
