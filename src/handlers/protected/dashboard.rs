use axum::extract::{Extension, State};

use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::services::dashboard_service::Dashboard;
use crate::services::DashboardService;
use crate::state::AppState;

/// GET /api/dashboard - portfolio summary
pub async fn dashboard_get(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
) -> ApiResult<Dashboard> {
    let summary = DashboardService::new(&state).summary(&user.actor()).await?;
    Ok(ApiResponse::success(summary))
}
