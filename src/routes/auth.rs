use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use validator::Validate;

use crate::{
    dto::auth_dto::{AuthResponse, LoginPayload, RegisterPayload, UserResponse},
    error::Result,
    utils::jwt::sign_token,
    AppState,
};

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = state.user_service.register(payload).await?;
    let token = sign_token(user.id, &user.role)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            role: user.role.clone(),
            user: UserResponse::from(user),
        }),
    ))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = state.user_service.login(payload).await?;
    let token = sign_token(user.id, &user.role)?;
    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(AuthResponse {
        token,
        role: user.role.clone(),
        user: UserResponse::from(user),
    }))
}
