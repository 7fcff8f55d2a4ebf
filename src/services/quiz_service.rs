use crate::dto::admin_dto::{CreateQuizPayload, UpdateQuizPayload};
use crate::error::{Error, Result};
use crate::models::quiz::Quiz;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct QuizService {
    pool: PgPool,
}

impl QuizService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_published(&self) -> Result<Vec<Quiz>> {
        let quizzes = sqlx::query_as::<_, Quiz>(
            r#"SELECT * FROM quizzes WHERE is_published = TRUE ORDER BY created_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(quizzes)
    }

    pub async fn list_all(&self) -> Result<Vec<Quiz>> {
        let quizzes =
            sqlx::query_as::<_, Quiz>(r#"SELECT * FROM quizzes ORDER BY created_at DESC"#)
                .fetch_all(&self.pool)
                .await?;
        Ok(quizzes)
    }

    /// Unpublished quizzes exist only for admin callers; everyone else gets
    /// the same `NotFound` an unknown id would produce.
    pub async fn get_for_viewer(&self, quiz_id: Uuid, is_admin: bool) -> Result<Quiz> {
        let quiz = sqlx::query_as::<_, Quiz>(r#"SELECT * FROM quizzes WHERE id = $1"#)
            .bind(quiz_id)
            .fetch_one(&self.pool)
            .await?;

        if !quiz.is_published && !is_admin {
            return Err(Error::NotFound("Quiz not found".to_string()));
        }
        Ok(quiz)
    }

    pub async fn create(&self, payload: CreateQuizPayload, created_by: Uuid) -> Result<Quiz> {
        let quiz = sqlx::query_as::<_, Quiz>(
            r#"
            INSERT INTO quizzes (title, description, created_by, time_limit_minutes)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&payload.title)
        .bind(payload.description)
        .bind(created_by)
        .bind(payload.time_limit_minutes)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(quiz_id = %quiz.id, title = %quiz.title, "Created quiz");
        Ok(quiz)
    }

    pub async fn update(&self, quiz_id: Uuid, payload: UpdateQuizPayload) -> Result<Quiz> {
        let quiz = sqlx::query_as::<_, Quiz>(
            r#"
            UPDATE quizzes
            SET
                title = COALESCE($1, title),
                description = COALESCE($2, description),
                time_limit_minutes = COALESCE($3, time_limit_minutes),
                updated_at = NOW()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(payload.title)
        .bind(payload.description)
        .bind(payload.time_limit_minutes)
        .bind(quiz_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(quiz)
    }

    pub async fn set_published(&self, quiz_id: Uuid, publish: bool) -> Result<Quiz> {
        let quiz = sqlx::query_as::<_, Quiz>(
            r#"
            UPDATE quizzes
            SET is_published = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(publish)
        .bind(quiz_id)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(quiz_id = %quiz.id, publish, "Changed quiz publish state");
        Ok(quiz)
    }

    pub async fn delete(&self, quiz_id: Uuid) -> Result<()> {
        let result = sqlx::query(r#"DELETE FROM quizzes WHERE id = $1"#)
            .bind(quiz_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Quiz not found".to_string()));
        }
        tracing::info!(%quiz_id, "Deleted quiz");
        Ok(())
    }
}
