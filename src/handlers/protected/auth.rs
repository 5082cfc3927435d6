use axum::extract::{Extension, State};
use serde_json::{json, Value};

use crate::handlers::JsonBody;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, ValidatedUser};
use crate::services::auth_service::ChangePasswordRequest;
use crate::services::AuthService;
use crate::state::AppState;

/// GET /api/auth/me - the caller and their organization
pub async fn me_get(State(state): State<AppState>, Extension(user): Extension<ValidatedUser>) -> ApiResult<Value> {
    let (user, organization) = AuthService::new(&state).me(&user.actor()).await?;
    Ok(ApiResponse::success(json!({
        "user": user.to_json(),
        "organization": organization.to_json(),
    })))
}

/// POST /api/auth/logout - revoke the presented token
pub async fn logout_post(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<()> {
    AuthService::new(&state).logout(&auth.claims).await?;
    Ok(ApiResponse::no_content())
}

/// PUT /api/auth/password - change the caller's password
pub async fn password_put(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    JsonBody(request): JsonBody<ChangePasswordRequest>,
) -> ApiResult<()> {
    AuthService::new(&state).change_password(&user.actor(), request).await?;
    Ok(ApiResponse::no_content())
}
