use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::attempt_dto::SelectAnswerPayload, error::Result, middleware::auth::Claims, AppState,
};

#[axum::debug_handler]
pub async fn create_session(
    State(state): State<AppState>,
    Path(quiz_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let user_id = claims.user_id()?;
    let session = state
        .attempt_service
        .create_session(user_id, quiz_id, claims.is_admin())
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

#[axum::debug_handler]
pub async fn start_session(
    State(state): State<AppState>,
    Path(quiz_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let user_id = claims.user_id()?;
    let session = state.attempt_service.start_session(user_id, quiz_id).await?;
    Ok(Json(session))
}

#[axum::debug_handler]
pub async fn save_answer(
    State(state): State<AppState>,
    Path(quiz_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SelectAnswerPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user_id = claims.user_id()?;
    let session = state
        .attempt_service
        .select_answer(user_id, quiz_id, payload)
        .await?;
    Ok(Json(session))
}

#[axum::debug_handler]
pub async fn advance_question(
    State(state): State<AppState>,
    Path(quiz_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let user_id = claims.user_id()?;
    let session = state.attempt_service.advance(user_id, quiz_id).await?;
    Ok(Json(session))
}

#[axum::debug_handler]
pub async fn retreat_question(
    State(state): State<AppState>,
    Path(quiz_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let user_id = claims.user_id()?;
    let session = state.attempt_service.retreat(user_id, quiz_id).await?;
    Ok(Json(session))
}

#[axum::debug_handler]
pub async fn session_status(
    State(state): State<AppState>,
    Path(quiz_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let user_id = claims.user_id()?;
    let session = state.attempt_service.status(user_id, quiz_id).await?;
    Ok(Json(session))
}

#[axum::debug_handler]
pub async fn submit_session(
    State(state): State<AppState>,
    Path(quiz_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let user_id = claims.user_id()?;
    let response = state.attempt_service.submit(user_id, quiz_id).await?;
    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn abandon_session(
    State(state): State<AppState>,
    Path(quiz_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let user_id = claims.user_id()?;
    state.attempt_service.abandon(user_id, quiz_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
