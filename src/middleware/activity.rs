use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};

use super::validate_user::ValidatedUser;
use crate::services::activity_service::{ActivityEntry, ActivityService};
use crate::state::AppState;

fn is_mutation(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

/// Records successful state-changing requests in the activity log
pub async fn activity_log_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let user = request.extensions().get::<ValidatedUser>().cloned();

    let response = next.run(request).await;

    let status = response.status();
    if let Some(user) = user.filter(|_| is_mutation(&method) && status.as_u16() < 400) {
        let entry = ActivityEntry::new(user.id, method.as_str(), &path, status.as_u16());
        // Logging must never turn a completed request into a failure
        if let Err(e) = ActivityService::new(&state).record(user.organization_id, &entry).await {
            tracing::warn!("Failed to record activity for {} {}: {}", method, path, e);
        }
    }

    response
}
