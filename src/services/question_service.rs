use crate::dto::admin_dto::{CreateQuestionPayload, UpdateQuestionPayload};
use crate::error::{Error, Result};
use crate::models::question::Question;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct QuestionService {
    pool: PgPool,
}

impl QuestionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_quiz(&self, quiz_id: Uuid) -> Result<Vec<Question>> {
        let questions = sqlx::query_as::<_, Question>(
            r#"SELECT * FROM questions WHERE quiz_id = $1 ORDER BY position, created_at"#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }

    pub async fn create(&self, payload: CreateQuestionPayload) -> Result<Question> {
        let question_type = payload
            .question_type
            .unwrap_or_else(|| "single_choice".to_string());
        validate_question(&payload.options, &payload.correct_answer, &question_type)?;

        let quiz_exists: bool =
            sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM quizzes WHERE id = $1)"#)
                .bind(payload.quiz_id)
                .fetch_one(&self.pool)
                .await?;
        if !quiz_exists {
            return Err(Error::NotFound("Quiz not found".to_string()));
        }

        let question = sqlx::query_as::<_, Question>(
            r#"
            INSERT INTO questions (quiz_id, question_text, options, correct_answer, points, question_type, position)
            VALUES (
                $1, $2, $3, $4, $5, $6,
                (SELECT COALESCE(MAX(position) + 1, 0) FROM questions WHERE quiz_id = $1)
            )
            RETURNING *
            "#,
        )
        .bind(payload.quiz_id)
        .bind(&payload.question_text)
        .bind(serde_json::to_value(&payload.options)?)
        .bind(&payload.correct_answer)
        .bind(payload.points)
        .bind(question_type)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(question_id = %question.id, quiz_id = %question.quiz_id, "Created question");
        Ok(question)
    }

    /// Partial update. The merged question must still satisfy the option
    /// invariants, so the stored row is folded in before validating.
    pub async fn update(&self, question_id: Uuid, payload: UpdateQuestionPayload) -> Result<Question> {
        let existing = sqlx::query_as::<_, Question>(r#"SELECT * FROM questions WHERE id = $1"#)
            .bind(question_id)
            .fetch_one(&self.pool)
            .await?;

        let effective_options = payload.options.clone().unwrap_or_else(|| existing.options_vec());
        let effective_correct = payload
            .correct_answer
            .clone()
            .unwrap_or_else(|| existing.correct_answer.clone());
        let effective_type = payload
            .question_type
            .clone()
            .unwrap_or_else(|| existing.question_type.clone());
        validate_question(&effective_options, &effective_correct, &effective_type)?;

        let options_json = match payload.options {
            Some(options) => Some(serde_json::to_value(options)?),
            None => None,
        };

        let question = sqlx::query_as::<_, Question>(
            r#"
            UPDATE questions
            SET
                question_text = COALESCE($1, question_text),
                options = COALESCE($2, options),
                correct_answer = COALESCE($3, correct_answer),
                points = COALESCE($4, points),
                question_type = COALESCE($5, question_type)
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(payload.question_text)
        .bind(options_json)
        .bind(payload.correct_answer)
        .bind(payload.points)
        .bind(payload.question_type)
        .bind(question_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(question)
    }

    pub async fn delete(&self, question_id: Uuid) -> Result<()> {
        let result = sqlx::query(r#"DELETE FROM questions WHERE id = $1"#)
            .bind(question_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Question not found".to_string()));
        }
        tracing::info!(%question_id, "Deleted question");
        Ok(())
    }
}

/// Invariants the database schema cannot express: option count per type,
/// non-blank options, and the correct answer being one of the options.
fn validate_question(options: &[String], correct_answer: &str, question_type: &str) -> Result<()> {
    match question_type {
        "single_choice" => {
            if options.len() < 2 || options.len() > 4 {
                return Err(Error::BadRequest(
                    "A single-choice question needs 2-4 options".to_string(),
                ));
            }
        }
        "true_false" => {
            if options.len() != 2 {
                return Err(Error::BadRequest(
                    "A true/false question needs exactly 2 options".to_string(),
                ));
            }
        }
        other => {
            return Err(Error::BadRequest(format!(
                "Unknown question type: {}",
                other
            )));
        }
    }

    if options.iter().any(|option| option.trim().is_empty()) {
        return Err(Error::BadRequest("Options must not be blank".to_string()));
    }
    if !options.iter().any(|option| option == correct_answer) {
        return Err(Error::BadRequest(
            "The correct answer must be one of the options".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn single_choice_needs_two_to_four_options() {
        assert!(validate_question(&opts(&["a"]), "a", "single_choice").is_err());
        assert!(validate_question(&opts(&["a", "b"]), "a", "single_choice").is_ok());
        assert!(validate_question(&opts(&["a", "b", "c", "d"]), "d", "single_choice").is_ok());
        assert!(
            validate_question(&opts(&["a", "b", "c", "d", "e"]), "a", "single_choice").is_err()
        );
    }

    #[test]
    fn true_false_needs_exactly_two_options() {
        assert!(validate_question(&opts(&["True", "False"]), "True", "true_false").is_ok());
        assert!(validate_question(&opts(&["True", "False", "Maybe"]), "True", "true_false").is_err());
    }

    #[test]
    fn correct_answer_must_be_an_option() {
        assert!(validate_question(&opts(&["a", "b"]), "c", "single_choice").is_err());
    }

    #[test]
    fn blank_options_are_rejected() {
        assert!(validate_question(&opts(&["a", "  "]), "a", "single_choice").is_err());
    }

    #[test]
    fn unknown_question_types_are_rejected() {
        assert!(validate_question(&opts(&["a", "b"]), "a", "essay").is_err());
    }
}
