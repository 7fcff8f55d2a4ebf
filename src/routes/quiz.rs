use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
};
use uuid::Uuid;

use crate::{error::Result, middleware::auth::OptionalClaims, AppState};

/// Published quizzes only. The admin surface has its own unfiltered list.
#[axum::debug_handler]
pub async fn list_quizzes(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let quizzes = state.quiz_service.list_published().await?;
    Ok(Json(quizzes))
}

#[axum::debug_handler]
pub async fn get_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    OptionalClaims(claims): OptionalClaims,
) -> Result<impl IntoResponse> {
    let is_admin = claims.map(|c| c.is_admin()).unwrap_or(false);
    let quiz = state.quiz_service.get_for_viewer(id, is_admin).await?;
    Ok(Json(quiz))
}

#[axum::debug_handler]
pub async fn list_quiz_questions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    OptionalClaims(claims): OptionalClaims,
) -> Result<impl IntoResponse> {
    let is_admin = claims.map(|c| c.is_admin()).unwrap_or(false);
    // Resolves visibility first so a hidden quiz 404s before any question
    // data is touched.
    state.quiz_service.get_for_viewer(id, is_admin).await?;
    let questions = state.question_service.list_for_quiz(id).await?;
    Ok(Json(questions))
}
