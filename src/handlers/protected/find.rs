use axum::extract::{Extension, Path, State};
use serde_json::Value;

use crate::filter::FilterData;
use crate::handlers::JsonBody;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::services::GenericService;
use crate::state::AppState;

/// POST /api/find/:collection - filtered search with the body as `FilterData`
pub async fn find_post(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(collection): Path<String>,
    JsonBody(filter_data): JsonBody<FilterData>,
) -> ApiResult<Vec<Value>> {
    let collection = GenericService::collection(&collection)?;
    let records = GenericService::new(&state)
        .list(&user.actor(), collection, filter_data)
        .await?;
    Ok(ApiResponse::success(records.iter().map(|r| r.to_json()).collect()))
}
