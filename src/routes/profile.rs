use axum::{
    extract::State,
    response::{IntoResponse, Json},
    Extension,
};
use validator::Validate;

use crate::{
    dto::auth_dto::{UpdateProfilePayload, UserResponse},
    error::Result,
    middleware::auth::Claims,
    AppState,
};

#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.get_by_id(claims.user_id()?).await?;
    Ok(Json(UserResponse::from(user)))
}

#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = state
        .user_service
        .update_profile(claims.user_id()?, payload)
        .await?;
    tracing::info!(user_id = %user.id, "Profile updated");
    Ok(Json(UserResponse::from(user)))
}

#[axum::debug_handler]
pub async fn list_my_results(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let results = state
        .result_service
        .list_for_user(claims.user_id()?)
        .await?;
    Ok(Json(results))
}
