use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - API information
pub async fn root_get() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "PropDesk API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Property management backend: buildings, suites, tenants, leases, payments and tickets",
            "endpoints": {
                "auth": "/auth/register, /auth/login (public)",
                "session": "/api/auth/me, /api/auth/logout, /api/auth/password",
                "organization": "/api/organization[/plan|/usage]",
                "users": "/api/users[/:id]",
                "data": "/api/data/:collection[/:id]",
                "find": "/api/find/:collection",
                "notifications": "/api/notifications[/unread-count|/read-all|/stream|/:id/read]",
                "activity": "/api/activity",
                "dashboard": "/api/dashboard"
            }
        }
    }))
}

/// GET /health - document store and cache reachability
pub async fn health_get(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let database = state.store.health_check().await;
    let cache = state.blacklist.ping().await;

    let status = |ok: bool| if ok { "ok" } else { "unavailable" };
    let healthy = database.is_ok() && cache.is_ok();

    if let Err(e) = &database {
        tracing::error!("Health check: database unavailable: {}", e);
    }
    if let Err(e) = &cache {
        tracing::error!("Health check: cache unavailable: {}", e);
    }

    let body = json!({
        "success": healthy,
        "data": {
            "status": if healthy { "ok" } else { "degraded" },
            "timestamp": now,
            "database": status(database.is_ok()),
            "cache": status(cache.is_ok())
        }
    });

    let code = if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (code, Json(body))
}
