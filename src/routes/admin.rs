use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::admin_dto::{
        CreateQuestionPayload, CreateQuizPayload, PublishQuizPayload, UpdateQuestionPayload,
        UpdateQuizPayload, UpdateUserPayload, UpdateUserStatusPayload, UserListQuery,
        UserListResponse,
    },
    dto::auth_dto::UserResponse,
    error::Result,
    middleware::auth::Claims,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/admin/quizzes",
    responses(
        (status = 200, description = "All quizzes including unpublished")
    )
)]
#[axum::debug_handler]
pub async fn list_quizzes(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let quizzes = state.quiz_service.list_all().await?;
    Ok(Json(quizzes))
}

#[utoipa::path(
    post,
    path = "/api/admin/quizzes",
    request_body = CreateQuizPayload,
    responses(
        (status = 201, description = "Quiz created successfully"),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn create_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let quiz = state
        .quiz_service
        .create(payload, claims.user_id()?)
        .await?;
    tracing::info!(quiz_id = %quiz.id, "Quiz created");
    Ok((StatusCode::CREATED, Json(quiz)))
}

#[utoipa::path(
    put,
    path = "/api/admin/quizzes/{id}",
    params(
        ("id" = Uuid, Path, description = "Quiz ID")
    ),
    request_body = UpdateQuizPayload,
    responses(
        (status = 200, description = "Quiz updated successfully"),
        (status = 404, description = "Quiz not found")
    )
)]
#[axum::debug_handler]
pub async fn update_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateQuizPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let quiz = state.quiz_service.update(id, payload).await?;
    Ok(Json(quiz))
}

#[utoipa::path(
    delete,
    path = "/api/admin/quizzes/{id}",
    params(
        ("id" = Uuid, Path, description = "Quiz ID")
    ),
    responses(
        (status = 204, description = "Quiz deleted successfully"),
        (status = 404, description = "Quiz not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.quiz_service.delete(id).await?;
    tracing::info!(quiz_id = %id, "Quiz deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/api/admin/quizzes/{id}/publish",
    params(
        ("id" = Uuid, Path, description = "Quiz ID")
    ),
    request_body = PublishQuizPayload,
    responses(
        (status = 200, description = "Publish flag updated"),
        (status = 404, description = "Quiz not found")
    )
)]
#[axum::debug_handler]
pub async fn publish_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PublishQuizPayload>,
) -> Result<impl IntoResponse> {
    let quiz = state.quiz_service.set_published(id, payload.publish).await?;
    tracing::info!(quiz_id = %id, published = payload.publish, "Quiz publish flag changed");
    Ok(Json(quiz))
}

#[utoipa::path(
    post,
    path = "/api/admin/questions",
    request_body = CreateQuestionPayload,
    responses(
        (status = 201, description = "Question created successfully"),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Quiz not found")
    )
)]
#[axum::debug_handler]
pub async fn create_question(
    State(state): State<AppState>,
    Json(payload): Json<CreateQuestionPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let question = state.question_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

#[utoipa::path(
    put,
    path = "/api/admin/questions/{id}",
    params(
        ("id" = Uuid, Path, description = "Question ID")
    ),
    request_body = UpdateQuestionPayload,
    responses(
        (status = 200, description = "Question updated successfully"),
        (status = 404, description = "Question not found")
    )
)]
#[axum::debug_handler]
pub async fn update_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateQuestionPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let question = state.question_service.update(id, payload).await?;
    Ok(Json(question))
}

#[utoipa::path(
    delete,
    path = "/api/admin/questions/{id}",
    params(
        ("id" = Uuid, Path, description = "Question ID")
    ),
    responses(
        (status = 204, description = "Question deleted successfully"),
        (status = 404, description = "Question not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.question_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(
        ("page" = Option<i64>, Query, description = "Page number"),
        ("per_page" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "Paginated list of users", body = Json<UserListResponse>)
    )
)]
#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<impl IntoResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let (users, total) = state.user_service.list_users(page, per_page).await?;
    Ok(Json(UserListResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
        total,
        page,
        per_page,
    }))
}

#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User found", body = Json<UserResponse>),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.get_by_id(id).await?;
    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = UpdateUserPayload,
    responses(
        (status = 200, description = "User updated successfully", body = Json<UserResponse>),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = state.user_service.update_user(id, payload).await?;
    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/status",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = UpdateUserStatusPayload,
    responses(
        (status = 200, description = "User activation flag updated", body = Json<UserResponse>),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
pub async fn update_user_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserStatusPayload>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.set_active(id, payload.is_active).await?;
    tracing::info!(user_id = %id, is_active = payload.is_active, "User status changed");
    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted successfully"),
        (status = 400, description = "Admin accounts cannot be deleted"),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.user_service.delete_user(id).await?;
    tracing::info!(user_id = %id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "Dashboard counters")
    )
)]
#[axum::debug_handler]
pub async fn dashboard_stats(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let stats = state.result_service.dashboard_stats().await?;
    Ok(Json(stats))
}
