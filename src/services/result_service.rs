use crate::dto::admin_dto::DashboardStats;
use crate::dto::result_dto::ResultSummary;
use crate::error::Result;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct ResultService {
    pool: PgPool,
}

impl ResultService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ResultSummary>> {
        let results = sqlx::query_as::<_, ResultSummary>(
            r#"
            SELECT r.id, r.quiz_id, q.title AS quiz_title, r.score, r.max_score,
                   r.timed_out, r.submitted_at
            FROM results r
            JOIN quizzes q ON q.id = r.quiz_id
            WHERE r.user_id = $1
            ORDER BY r.submitted_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(results)
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let total_users: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM users"#)
            .fetch_one(&self.pool)
            .await?;
        let total_quizzes: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM quizzes"#)
            .fetch_one(&self.pool)
            .await?;
        let published_quizzes: i64 =
            sqlx::query_scalar(r#"SELECT COUNT(*) FROM quizzes WHERE is_published = TRUE"#)
                .fetch_one(&self.pool)
                .await?;
        let total_results: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM results"#)
            .fetch_one(&self.pool)
            .await?;

        Ok(DashboardStats {
            total_users,
            total_quizzes,
            published_quizzes,
            total_results,
        })
    }
}
