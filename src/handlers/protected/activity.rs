use axum::extract::{Extension, Query, State};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult, OrganizationContext, ValidatedUser};
use crate::services::ActivityService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub user_id: Option<Uuid>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

/// GET /api/activity - owner/admin, plans with the activity log
pub async fn activity_get(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Extension(organization): Extension<OrganizationContext>,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<Vec<Value>> {
    let entries = ActivityService::new(&state)
        .list(&user.actor(), organization.plan, query.user_id, query.limit, query.offset)
        .await?;
    Ok(ApiResponse::success(entries.iter().map(|e| e.to_json()).collect()))
}
