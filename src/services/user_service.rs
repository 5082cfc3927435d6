//! Team management inside an organization.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::auth::PasswordService;
use crate::config::AppConfig;
use crate::database::{Collection, Document, DocumentStore, NewDocument, Scope};
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::state::AppState;
use crate::types::{Actor, Role};

const ADMINS: &[Role] = &[Role::Owner, Role::Admin];
const VIEWERS: &[Role] = &[Role::Owner, Role::Admin, Role::Manager];

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub tenant_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
    pub tenant_id: Option<Uuid>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trimmed, non-empty value of a required text field
pub fn required_text(field: &str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::invalid_field(field, "This field is required"));
    }
    Ok(trimmed.to_string())
}

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(ApiError::invalid_field("email", "Must be a valid email address")),
    }
}

/// Looks a user up by email across every organization
pub async fn find_by_email(store: &dyn DocumentStore, email: &str) -> Result<Option<Document>, ApiError> {
    Ok(store
        .find_one(Collection::Users, Scope::Global, json!({ "email": normalize_email(email) }))
        .await?)
}

/// A new user account; emails are unique across the platform
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub role: Role,
    pub tenant_id: Option<Uuid>,
}

pub async fn insert_user(
    store: &dyn DocumentStore,
    config: &AppConfig,
    organization_id: Uuid,
    user: NewUser<'_>,
) -> Result<Document, ApiError> {
    let name = required_text("name", user.name)?;
    let email = normalize_email(user.email);
    validate_email(&email)?;
    PasswordService::validate(user.password, config.security.min_password_length)?;

    if find_by_email(store, &email).await?.is_some() {
        return Err(ApiError::conflict("Email is already registered"));
    }

    let mut body = Map::new();
    body.insert("name".to_string(), json!(name));
    body.insert("email".to_string(), json!(email));
    body.insert("password_hash".to_string(), json!(PasswordService::hash(user.password)?));
    body.insert("role".to_string(), json!(user.role));
    body.insert("active".to_string(), Value::Bool(true));
    if let Some(tenant_id) = user.tenant_id {
        body.insert("tenant_id".to_string(), json!(tenant_id.to_string()));
    }

    store
        .insert(Collection::Users, NewDocument::new(organization_id, body))
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::Conflict(_) => ApiError::conflict("Email is already registered"),
            other => other,
        })
}

fn require_role(actor: &Actor, roles: &[Role], action: &str) -> Result<(), ApiError> {
    if actor.role.is_one_of(roles) {
        return Ok(());
    }
    Err(ApiError::forbidden(format!("Role '{}' cannot {}", actor.role, action)))
}

pub struct UserService {
    config: Arc<AppConfig>,
    store: Arc<dyn DocumentStore>,
}

impl UserService {
    pub fn new(state: &AppState) -> Self {
        Self {
            config: state.config.clone(),
            store: state.store.clone(),
        }
    }

    fn scope(actor: &Actor) -> Scope {
        Scope::Organization(actor.organization_id)
    }

    pub async fn list(&self, actor: &Actor) -> Result<Vec<Document>, ApiError> {
        require_role(actor, VIEWERS, "list users")?;
        let filter = FilterData::default().order_by("name asc");
        Ok(self.store.find(Collection::Users, Self::scope(actor), &filter).await?)
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<Document, ApiError> {
        require_role(actor, ADMINS, "view users")?;
        self.load(actor, id).await
    }

    async fn load(&self, actor: &Actor, id: Uuid) -> Result<Document, ApiError> {
        self.store
            .find_by_id(Collection::Users, Self::scope(actor), id)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    async fn check_tenant(&self, actor: &Actor, tenant_id: Uuid) -> Result<(), ApiError> {
        match self.store.find_by_id(Collection::Tenants, Self::scope(actor), tenant_id).await? {
            Some(_) => Ok(()),
            None => Err(ApiError::invalid_field("tenant_id", "Tenant not found")),
        }
    }

    pub async fn create(&self, actor: &Actor, request: CreateUserRequest) -> Result<Document, ApiError> {
        require_role(actor, ADMINS, "create users")?;
        if request.role == Role::Owner {
            return Err(ApiError::forbidden("An organization has exactly one owner"));
        }
        if let Some(tenant_id) = request.tenant_id {
            self.check_tenant(actor, tenant_id).await?;
        }

        let user = insert_user(
            self.store.as_ref(),
            &self.config,
            actor.organization_id,
            NewUser {
                name: &request.name,
                email: &request.email,
                password: &request.password,
                role: request.role,
                tenant_id: request.tenant_id,
            },
        )
        .await?;

        tracing::info!(user_id = %user.id, role = %request.role, created_by = %actor.user_id, "User created");
        Ok(user)
    }

    pub async fn update(&self, actor: &Actor, id: Uuid, request: UpdateUserRequest) -> Result<Document, ApiError> {
        require_role(actor, ADMINS, "update users")?;
        let target = self.load(actor, id).await?;
        let target_is_owner = target.get_str("role") == Some(Role::Owner.as_str());

        let mut changes = Map::new();
        if let Some(name) = &request.name {
            if target_is_owner && actor.user_id != target.id {
                return Err(ApiError::forbidden("Only the owner can change the owner's profile"));
            }
            changes.insert("name".to_string(), json!(required_text("name", name)?));
        }
        if let Some(role) = request.role {
            if role == Role::Owner || target_is_owner {
                return Err(ApiError::forbidden("The owner role cannot be assigned or removed"));
            }
            changes.insert("role".to_string(), json!(role));
        }
        if let Some(active) = request.active {
            if target_is_owner || target.id == actor.user_id {
                return Err(ApiError::forbidden("This account cannot be deactivated"));
            }
            changes.insert("active".to_string(), Value::Bool(active));
        }
        if let Some(tenant_id) = request.tenant_id {
            self.check_tenant(actor, tenant_id).await?;
            changes.insert("tenant_id".to_string(), json!(tenant_id.to_string()));
        }

        if changes.is_empty() {
            return Ok(target);
        }

        let updated = self
            .store
            .update(Collection::Users, Self::scope(actor), id, changes)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        tracing::info!(user_id = %id, updated_by = %actor.user_id, "User updated");
        Ok(updated)
    }

    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<Document, ApiError> {
        require_role(actor, ADMINS, "delete users")?;
        if id == actor.user_id {
            return Err(ApiError::forbidden("You cannot delete your own account"));
        }
        let target = self.load(actor, id).await?;
        if target.get_str("role") == Some(Role::Owner.as_str()) {
            return Err(ApiError::forbidden("The organization owner cannot be deleted"));
        }

        let deleted = self
            .store
            .delete(Collection::Users, Self::scope(actor), id)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        tracing::info!(user_id = %id, deleted_by = %actor.user_id, "User deleted");
        Ok(deleted)
    }
}
