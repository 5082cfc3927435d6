use axum::extract::{Extension, State};
use serde_json::Value;

use crate::handlers::JsonBody;
use crate::middleware::{ApiResponse, ApiResult, OrganizationContext, ValidatedUser};
use crate::services::organization_service::{ChangePlanRequest, UpdateOrganizationRequest};
use crate::services::OrganizationService;
use crate::state::AppState;

/// GET /api/organization
pub async fn organization_get(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
) -> ApiResult<Value> {
    let organization = OrganizationService::new(&state).get(&user.actor()).await?;
    Ok(ApiResponse::success(organization.to_json()))
}

/// PUT /api/organization - owner/admin profile update
pub async fn organization_put(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    JsonBody(request): JsonBody<UpdateOrganizationRequest>,
) -> ApiResult<Value> {
    let organization = OrganizationService::new(&state).update(&user.actor(), request).await?;
    Ok(ApiResponse::success(organization.to_json()))
}

/// PUT /api/organization/plan - owner changes the subscription plan
pub async fn plan_put(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Extension(organization): Extension<OrganizationContext>,
    JsonBody(request): JsonBody<ChangePlanRequest>,
) -> ApiResult<Value> {
    let updated = OrganizationService::new(&state)
        .change_plan(&user.actor(), organization.plan, request.plan)
        .await?;
    Ok(ApiResponse::success(updated.to_json()))
}

/// GET /api/organization/usage - counts against plan limits
pub async fn usage_get(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Extension(organization): Extension<OrganizationContext>,
) -> ApiResult<Value> {
    let usage = OrganizationService::new(&state).usage(&user.actor(), organization.plan).await?;
    Ok(ApiResponse::success(usage))
}
