//! Registration, login, logout and password changes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::auth::{generate_jwt, Claims, PasswordService};
use crate::cache::TokenBlacklist;
use crate::config::AppConfig;
use crate::database::{Collection, Document, DocumentStore, NewDocument, Scope};
use crate::error::ApiError;
use crate::plans::Plan;
use crate::services::user_service::{self, NewUser};
use crate::state::AppState;
use crate::types::{Actor, Role};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub organization_name: String,
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Token plus the user and organization it was issued for
#[derive(Debug, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub expires_in: u64,
    pub user: Value,
    pub organization: Value,
}

const BAD_CREDENTIALS: &str = "Invalid email or password";

pub struct AuthService {
    config: Arc<AppConfig>,
    store: Arc<dyn DocumentStore>,
    blacklist: Arc<dyn TokenBlacklist>,
}

impl AuthService {
    pub fn new(state: &AppState) -> Self {
        Self {
            config: state.config.clone(),
            store: state.store.clone(),
            blacklist: state.blacklist.clone(),
        }
    }

    fn session(&self, user: &Document, organization: &Document, role: Role) -> Result<AuthSession, ApiError> {
        let claims = Claims::new(user.id, organization.id, role, &self.config.security);
        let token = generate_jwt(&claims, &self.config.security)?;
        Ok(AuthSession {
            token,
            expires_in: self.config.security.jwt_expiry_hours * 3600,
            user: user.to_json(),
            organization: organization.to_json(),
        })
    }

    /// Creates an organization on the free plan with the caller as its owner
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthSession, ApiError> {
        let organization_name = user_service::required_text("organization_name", &request.organization_name)?;
        user_service::required_text("name", &request.name)?;
        user_service::validate_email(&user_service::normalize_email(&request.email))?;
        PasswordService::validate(&request.password, self.config.security.min_password_length)?;

        if user_service::find_by_email(self.store.as_ref(), &request.email).await?.is_some() {
            return Err(ApiError::conflict("Email is already registered"));
        }

        let mut body = Map::new();
        body.insert("name".to_string(), json!(organization_name));
        body.insert("plan".to_string(), json!(Plan::Free));
        body.insert("active".to_string(), Value::Bool(true));
        let organization = self
            .store
            .insert(Collection::Organizations, NewDocument::organization(body))
            .await?;
        let scope = Scope::Organization(organization.id);

        let owner = NewUser {
            name: &request.name,
            email: &request.email,
            password: &request.password,
            role: Role::Owner,
            tenant_id: None,
        };
        let user = match user_service::insert_user(self.store.as_ref(), &self.config, organization.id, owner).await {
            Ok(user) => user,
            Err(e) => {
                // Lost a race on the email; do not leave an ownerless organization behind
                self.store.delete(Collection::Organizations, scope, organization.id).await?;
                return Err(e);
            }
        };

        let mut owner_ref = Map::new();
        owner_ref.insert("owner_id".to_string(), json!(user.id.to_string()));
        let organization = self
            .store
            .update(Collection::Organizations, scope, organization.id, owner_ref)
            .await?
            .ok_or_else(|| ApiError::internal_server_error("Organization disappeared during registration"))?;

        tracing::info!(organization_id = %organization.id, user_id = %user.id, "Organization registered");
        self.session(&user, &organization, Role::Owner)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthSession, ApiError> {
        let user = user_service::find_by_email(self.store.as_ref(), &request.email)
            .await?
            .ok_or_else(|| ApiError::unauthorized(BAD_CREDENTIALS))?;

        let hash = user.get_str("password_hash").unwrap_or_default();
        if hash.is_empty() || !PasswordService::verify(&request.password, hash)? {
            tracing::warn!(user_id = %user.id, "Failed login attempt");
            return Err(ApiError::unauthorized(BAD_CREDENTIALS));
        }
        if !user.get_bool("active").unwrap_or(true) {
            return Err(ApiError::forbidden("Account is deactivated"));
        }

        let organization_id = user
            .organization_id
            .ok_or_else(|| ApiError::forbidden("Account does not belong to an organization"))?;
        let organization = self
            .store
            .find_by_id(Collection::Organizations, Scope::Organization(organization_id), organization_id)
            .await?
            .filter(|org| org.get_bool("active").unwrap_or(true))
            .ok_or_else(|| ApiError::forbidden("Organization is not active"))?;

        let role: Role = user
            .get_str("role")
            .and_then(|r| r.parse().ok())
            .ok_or_else(|| ApiError::forbidden("Account has no valid role"))?;

        tracing::info!(user_id = %user.id, organization_id = %organization.id, "User logged in");
        self.session(&user, &organization, role)
    }

    /// Revokes the token until it would have expired on its own
    pub async fn logout(&self, claims: &Claims) -> Result<(), ApiError> {
        self.blacklist.revoke(&claims.jti, claims.remaining_lifetime()).await?;
        tracing::info!(user_id = %claims.sub, "User logged out");
        Ok(())
    }

    pub async fn change_password(&self, actor: &Actor, request: ChangePasswordRequest) -> Result<(), ApiError> {
        let scope = Scope::Organization(actor.organization_id);
        let user = self
            .store
            .find_by_id(Collection::Users, scope, actor.user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;

        let hash = user.get_str("password_hash").unwrap_or_default();
        if hash.is_empty() || !PasswordService::verify(&request.current_password, hash)? {
            return Err(ApiError::invalid_field("current_password", "Current password is incorrect"));
        }
        PasswordService::validate(&request.new_password, self.config.security.min_password_length)
            .map_err(|e| ApiError::invalid_field("new_password", e.to_string()))?;

        let mut changes = Map::new();
        changes.insert("password_hash".to_string(), json!(PasswordService::hash(&request.new_password)?));
        self.store.update(Collection::Users, scope, actor.user_id, changes).await?;

        tracing::info!(user_id = %actor.user_id, "Password changed");
        Ok(())
    }

    /// Current user and organization documents
    pub async fn me(&self, actor: &Actor) -> Result<(Document, Document), ApiError> {
        let scope = Scope::Organization(actor.organization_id);
        let user = self
            .store
            .find_by_id(Collection::Users, scope, actor.user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        let organization = self
            .store
            .find_by_id(Collection::Organizations, scope, actor.organization_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Organization not found"))?;
        Ok((user, organization))
    }
}

