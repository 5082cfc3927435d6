use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};

use super::validate_organization::OrganizationContext;
use crate::database::Collection;
use crate::error::ApiError;
use crate::plans::QuotaResource;
use crate::services::QuotaService;
use crate::state::AppState;

/// Quota resource a create request adds to, read from the request path
pub fn resource_for_path(path: &str) -> Option<QuotaResource> {
    let rest = path.trim_start_matches('/').strip_prefix("api/")?;
    let mut segments = rest.split('/').filter(|s| !s.is_empty());

    match (segments.next(), segments.next(), segments.next()) {
        (Some("users"), None, _) => Some(QuotaResource::Users),
        (Some("data"), Some(collection), None) => collection
            .parse::<Collection>()
            .ok()
            .and_then(QuotaResource::for_collection),
        _ => None,
    }
}

/// Rejects creates that would take the organization past its plan limit
pub async fn enforce_quota_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if request.method() != Method::POST {
        return Ok(next.run(request).await);
    }
    let Some(resource) = resource_for_path(request.uri().path()) else {
        return Ok(next.run(request).await);
    };

    let organization = request
        .extensions()
        .get::<OrganizationContext>()
        .cloned()
        .ok_or_else(|| ApiError::internal_server_error("Organization context missing for quota check"))?;

    QuotaService::new(state.store.clone())
        .check(organization.id, organization.plan, resource)
        .await?;

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_resolve_to_quota_resources() {
        assert_eq!(resource_for_path("/api/users"), Some(QuotaResource::Users));
        assert_eq!(resource_for_path("/api/data/suites"), Some(QuotaResource::Suites));
        assert_eq!(resource_for_path("/api/data/buildings/"), Some(QuotaResource::Buildings));
        assert_eq!(resource_for_path("/api/data/tickets"), None);
        assert_eq!(resource_for_path("/api/data/suites/123"), None);
        assert_eq!(resource_for_path("/auth/register"), None);
    }
}
