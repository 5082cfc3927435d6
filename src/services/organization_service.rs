//! Organization profile and subscription plan.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::database::{Collection, Document, DocumentStore, Scope};
use crate::error::ApiError;
use crate::plans::Plan;
use crate::services::quota_service::QuotaService;
use crate::services::user_service::required_text;
use crate::state::AppState;
use crate::types::{Actor, Role};

#[derive(Debug, Deserialize)]
pub struct UpdateOrganizationRequest {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePlanRequest {
    pub plan: Plan,
}

/// The plan stored on an organization document; unknown values fall back to free
pub fn plan_of(organization: &Document) -> Plan {
    organization
        .get_str("plan")
        .and_then(|p| p.parse().ok())
        .unwrap_or(Plan::Free)
}

pub struct OrganizationService {
    store: Arc<dyn DocumentStore>,
    quotas: QuotaService,
}

impl OrganizationService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            quotas: QuotaService::new(state.store.clone()),
        }
    }

    pub async fn get(&self, actor: &Actor) -> Result<Document, ApiError> {
        self.store
            .find_by_id(Collection::Organizations, Scope::Organization(actor.organization_id), actor.organization_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Organization not found"))
    }

    async fn write(&self, actor: &Actor, changes: Map<String, Value>) -> Result<Document, ApiError> {
        self.store
            .update(
                Collection::Organizations,
                Scope::Organization(actor.organization_id),
                actor.organization_id,
                changes,
            )
            .await?
            .ok_or_else(|| ApiError::not_found("Organization not found"))
    }

    pub async fn update(&self, actor: &Actor, request: UpdateOrganizationRequest) -> Result<Document, ApiError> {
        if !actor.role.is_one_of(&[Role::Owner, Role::Admin]) {
            return Err(ApiError::forbidden("Only owners and admins can update the organization"));
        }

        let mut changes = Map::new();
        if let Some(name) = request.name {
            changes.insert("name".to_string(), json!(required_text("name", &name)?));
        }
        if changes.is_empty() {
            return self.get(actor).await;
        }

        let organization = self.write(actor, changes).await?;
        tracing::info!(organization_id = %organization.id, "Organization updated");
        Ok(organization)
    }

    /// Upgrades always succeed; downgrades only when current usage fits the new plan
    pub async fn change_plan(&self, actor: &Actor, current: Plan, target: Plan) -> Result<Document, ApiError> {
        if actor.role != Role::Owner {
            return Err(ApiError::forbidden("Only the owner can change the plan"));
        }
        if target == current {
            return self.get(actor).await;
        }
        if target < current {
            self.quotas.can_downgrade(actor.organization_id, target).await?;
        }

        let mut changes = Map::new();
        changes.insert("plan".to_string(), json!(target));
        let organization = self.write(actor, changes).await?;

        tracing::info!(
            organization_id = %organization.id,
            from = current.as_str(),
            to = target.as_str(),
            "Plan changed"
        );
        Ok(organization)
    }

    pub async fn usage(&self, actor: &Actor, plan: Plan) -> Result<Value, ApiError> {
        let usage = self.quotas.usage(actor.organization_id, plan).await?;
        Ok(json!({
            "plan": plan,
            "features": plan.features(),
            "usage": usage,
        }))
    }
}
