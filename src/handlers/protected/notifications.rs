use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Extension, Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::handlers::extract::parse_id;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::services::notification_service::present;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InboxQuery {
    #[serde(default)]
    pub unread: bool,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

/// GET /api/notifications - newest first
pub async fn notifications_get(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Query(query): Query<InboxQuery>,
) -> ApiResult<Vec<Value>> {
    let limit = state.config.page_limit(query.limit)?;
    let notes = state
        .notifications()
        .inbox(user.organization_id, user.id, query.unread, limit, query.offset)
        .await?;
    Ok(ApiResponse::success(notes.iter().map(|n| present(n, user.id)).collect()))
}

/// GET /api/notifications/unread-count
pub async fn unread_count_get(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
) -> ApiResult<Value> {
    let count = state.notifications().unread_count(user.organization_id, user.id).await?;
    Ok(ApiResponse::success(json!({ "count": count })))
}

/// PUT /api/notifications/:id/read
pub async fn read_put(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = parse_id(&id, || "Notification not found".to_string())?;
    let note = state.notifications().mark_read(user.organization_id, user.id, id).await?;
    Ok(ApiResponse::success(present(&note, user.id)))
}

/// PUT /api/notifications/read-all
pub async fn read_all_put(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
) -> ApiResult<Value> {
    let updated = state.notifications().mark_all_read(user.organization_id, user.id).await?;
    Ok(ApiResponse::success(json!({ "updated": updated })))
}

/// GET /api/notifications/stream - Server-Sent Events for notifications addressed to the caller
pub async fn stream_get(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let notes = state.notifications().subscribe(user.organization_id, user.id).await?;
    tracing::debug!(user_id = %user.id, "Notification stream opened");

    let events = notes.map(|note| Ok(Event::default().event("notification").data(note.to_string())));

    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
