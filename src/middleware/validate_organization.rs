use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use super::auth::AuthUser;
use crate::database::{Collection, Scope};
use crate::error::ApiError;
use crate::plans::Plan;
use crate::services::organization_service::plan_of;
use crate::state::AppState;

/// The caller's organization, loaded fresh on every request
#[derive(Clone, Debug)]
pub struct OrganizationContext {
    pub id: Uuid,
    pub name: String,
    pub plan: Plan,
}

/// Middleware that loads the organization named in the token and rejects inactive ones
pub async fn validate_organization_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before organization validation"))?;
    let organization_id = auth_user.claims.org;

    let organization = state
        .store
        .find_by_id(Collection::Organizations, Scope::Organization(organization_id), organization_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!(%organization_id, "Token references a missing organization");
            ApiError::forbidden("Organization not found")
        })?;

    if !organization.get_bool("active").unwrap_or(true) {
        tracing::warn!(%organization_id, "Request for inactive organization");
        return Err(ApiError::forbidden("Organization is not active"));
    }

    let context = OrganizationContext {
        id: organization.id,
        name: organization.get_str("name").unwrap_or_default().to_string(),
        plan: plan_of(&organization),
    };
    tracing::debug!(organization_id = %context.id, plan = context.plan.as_str(), "Organization validated");

    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}
