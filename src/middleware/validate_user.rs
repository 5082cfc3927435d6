use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use super::auth::AuthUser;
use crate::database::{Collection, Scope};
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::{Actor, Role};

/// Validated user information from the organization's users
#[derive(Clone, Debug)]
pub struct ValidatedUser {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub tenant_id: Option<Uuid>,
}

impl ValidatedUser {
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.id,
            organization_id: self.organization_id,
            role: self.role,
            tenant_id: self.tenant_id,
        }
    }
}

/// Middleware that validates the user from JWT claims against the organization's users.
/// Ensures the user exists, is active, and still holds the role the token was issued for.
pub async fn validate_user_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before user validation"))?;
    let claims = &auth_user.claims;

    let user = state
        .store
        .find_by_id(Collection::Users, Scope::Organization(claims.org), claims.sub)
        .await?
        .ok_or_else(|| {
            tracing::warn!(user_id = %claims.sub, organization_id = %claims.org, "User not found in organization");
            ApiError::forbidden("User is not a member of this organization")
        })?;

    if !user.get_bool("active").unwrap_or(true) {
        return Err(ApiError::forbidden("Account is deactivated"));
    }

    // A role change invalidates tokens issued for the old role
    let role: Option<Role> = user.get_str("role").and_then(|r| r.parse().ok());
    if role != Some(claims.role) {
        tracing::warn!(user_id = %claims.sub, token_role = %claims.role, "Token role no longer matches user");
        return Err(ApiError::forbidden("User role has changed, please log in again"));
    }

    let validated_user = ValidatedUser {
        id: user.id,
        organization_id: claims.org,
        name: user.get_str("name").unwrap_or_default().to_string(),
        email: user.get_str("email").unwrap_or_default().to_string(),
        role: claims.role,
        tenant_id: user.get_uuid("tenant_id"),
    };

    tracing::debug!(user_id = %validated_user.id, role = %validated_user.role, "User validated");
    request.extensions_mut().insert(validated_user);
    Ok(next.run(request).await)
}
