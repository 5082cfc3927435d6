use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::handlers::{protected, public};
use crate::middleware::{
    activity_log_middleware, enforce_quota_middleware, jwt_auth_middleware, validate_organization_middleware,
    validate_user_middleware,
};
use crate::state::AppState;

/// The complete HTTP application
pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(public::root_get))
        .route("/health", get(public::health_get))
        .route("/auth/register", post(public::register_post))
        .route("/auth/login", post(public::login_post))
        // Protected API
        .merge(protected_routes(&state))
        .layer(DefaultBodyLimit::max(state.config.api.max_request_size_bytes));

    if state.config.security.enable_cors {
        router = router.layer(cors_layer(&state.config.security));
    }
    if state.config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

/// `/api/*`: token, organization and user are validated before any handler runs
fn protected_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(organization_routes())
        .merge(quota_routes(state))
        .merge(user_routes())
        .merge(data_routes())
        .merge(notification_routes())
        .route("/api/find/:collection", post(protected::find::find_post))
        .route("/api/activity", get(protected::activity::activity_get))
        .route("/api/dashboard", get(protected::dashboard::dashboard_get))
        // Layers run bottom to top: jwt, organization, user, activity log
        .layer(from_fn_with_state(state.clone(), activity_log_middleware))
        .layer(from_fn_with_state(state.clone(), validate_user_middleware))
        .layer(from_fn_with_state(state.clone(), validate_organization_middleware))
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
}

fn auth_routes() -> Router<AppState> {
    use protected::auth;

    Router::new()
        .route("/api/auth/me", get(auth::me_get))
        .route("/api/auth/logout", post(auth::logout_post))
        .route("/api/auth/password", put(auth::password_put))
}

fn organization_routes() -> Router<AppState> {
    use protected::organization;

    Router::new()
        .route(
            "/api/organization",
            get(organization::organization_get).put(organization::organization_put),
        )
        .route("/api/organization/plan", put(organization::plan_put))
        .route("/api/organization/usage", get(organization::usage_get))
}

/// Routes whose POST creates a quota-limited resource
fn quota_routes(state: &AppState) -> Router<AppState> {
    use protected::{data, users};

    Router::new()
        .route("/api/users", get(users::users_get).post(users::users_post))
        .route(
            "/api/data/:collection",
            get(data::collection_get).post(data::collection_post),
        )
        .route_layer(from_fn_with_state(state.clone(), enforce_quota_middleware))
}

fn user_routes() -> Router<AppState> {
    use protected::users;

    Router::new().route(
        "/api/users/:id",
        get(users::user_get).put(users::user_put).delete(users::user_delete),
    )
}

fn data_routes() -> Router<AppState> {
    use protected::data;

    Router::new().route(
        "/api/data/:collection/:id",
        get(data::record_get)
            .put(data::record_put)
            .patch(data::record_put)
            .delete(data::record_delete),
    )
}

fn notification_routes() -> Router<AppState> {
    use protected::notifications;

    Router::new()
        .route("/api/notifications", get(notifications::notifications_get))
        .route("/api/notifications/unread-count", get(notifications::unread_count_get))
        .route("/api/notifications/read-all", put(notifications::read_all_put))
        .route("/api/notifications/stream", get(notifications::stream_get))
        .route("/api/notifications/:id/read", put(notifications::read_put))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.is_empty() || security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
