use axum::extract::{Extension, Path, State};
use serde_json::Value;

use crate::handlers::extract::parse_id;
use crate::handlers::JsonBody;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::services::user_service::{CreateUserRequest, UpdateUserRequest};
use crate::services::UserService;
use crate::state::AppState;

fn user_not_found() -> String {
    "User not found".to_string()
}

/// GET /api/users
pub async fn users_get(State(state): State<AppState>, Extension(user): Extension<ValidatedUser>) -> ApiResult<Vec<Value>> {
    let users = UserService::new(&state).list(&user.actor()).await?;
    Ok(ApiResponse::success(users.iter().map(|u| u.to_json()).collect()))
}

/// POST /api/users - quota-checked by the route layer
pub async fn users_post(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    JsonBody(request): JsonBody<CreateUserRequest>,
) -> ApiResult<Value> {
    let created = UserService::new(&state).create(&user.actor(), request).await?;
    Ok(ApiResponse::created(created.to_json()))
}

/// GET /api/users/:id
pub async fn user_get(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = parse_id(&id, user_not_found)?;
    let found = UserService::new(&state).get(&user.actor(), id).await?;
    Ok(ApiResponse::success(found.to_json()))
}

/// PUT /api/users/:id
pub async fn user_put(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<UpdateUserRequest>,
) -> ApiResult<Value> {
    let id = parse_id(&id, user_not_found)?;
    let updated = UserService::new(&state).update(&user.actor(), id, request).await?;
    Ok(ApiResponse::success(updated.to_json()))
}

/// DELETE /api/users/:id
pub async fn user_delete(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = parse_id(&id, user_not_found)?;
    let deleted = UserService::new(&state).delete(&user.actor(), id).await?;
    Ok(ApiResponse::success(deleted.to_json()))
}
