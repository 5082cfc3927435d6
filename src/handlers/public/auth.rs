use axum::extract::State;

use crate::handlers::JsonBody;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::auth_service::{AuthSession, LoginRequest, RegisterRequest};
use crate::services::AuthService;
use crate::state::AppState;

/// POST /auth/register - create an organization and its owner, returns a token
pub async fn register_post(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> ApiResult<AuthSession> {
    let session = AuthService::new(&state).register(request).await?;
    Ok(ApiResponse::created(session))
}

/// POST /auth/login - exchange email and password for a token
pub async fn login_post(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> ApiResult<AuthSession> {
    let session = AuthService::new(&state).login(request).await?;
    Ok(ApiResponse::success(session))
}
