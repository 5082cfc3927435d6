//! Audit trail of state-changing API requests.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::database::{Collection, Document, DocumentStore, NewDocument, Scope};
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::plans::{Feature, Plan};
use crate::state::AppState;
use crate::types::{Actor, Role};

/// One logged request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEntry {
    pub user_id: Uuid,
    pub action: String,
    pub method: String,
    pub path: String,
    pub resource: Option<String>,
    pub resource_id: Option<String>,
    pub status: u16,
}

impl ActivityEntry {
    pub fn new(user_id: Uuid, method: &str, path: &str, status: u16) -> Self {
        let (resource, resource_id) = parse_resource(path);
        Self {
            user_id,
            action: action_for(method).to_string(),
            method: method.to_string(),
            path: path.to_string(),
            resource,
            resource_id,
            status,
        }
    }
}

pub fn action_for(method: &str) -> &'static str {
    match method {
        "POST" => "create",
        "PUT" | "PATCH" => "update",
        "DELETE" => "delete",
        _ => "read",
    }
}

/// Resource name and id from an API path
///
/// `/api/data/suites/<id>` is `("suites", <id>)`; `/api/users/<id>` is `("users", <id>)`.
pub fn parse_resource(path: &str) -> (Option<String>, Option<String>) {
    let mut segments = path
        .trim_start_matches('/')
        .trim_start_matches("api/")
        .split('/')
        .filter(|s| !s.is_empty());

    let mut resource = segments.next();
    if resource == Some("data") {
        resource = segments.next();
    }
    let id = segments.next();
    (resource.map(str::to_string), id.map(str::to_string))
}

pub struct ActivityService {
    config: Arc<AppConfig>,
    store: Arc<dyn DocumentStore>,
}

impl ActivityService {
    pub fn new(state: &AppState) -> Self {
        Self {
            config: state.config.clone(),
            store: state.store.clone(),
        }
    }

    pub async fn record(&self, organization_id: Uuid, entry: &ActivityEntry) -> Result<Document, ApiError> {
        let body: Map<String, Value> = match serde_json::to_value(entry) {
            Ok(Value::Object(map)) => map,
            _ => return Err(ApiError::internal_server_error("Failed to serialize activity entry")),
        };
        Ok(self
            .store
            .insert(Collection::ActivityLogs, NewDocument::new(organization_id, body))
            .await?)
    }

    /// Most recent entries first; owner/admin on plans with the activity log
    pub async fn list(
        &self,
        actor: &Actor,
        plan: Plan,
        user_id: Option<Uuid>,
        limit: Option<i32>,
        offset: Option<i32>,
    ) -> Result<Vec<Document>, ApiError> {
        if !actor.role.is_one_of(&[Role::Owner, Role::Admin]) {
            return Err(ApiError::forbidden("Only owners and admins can view the activity log"));
        }
        if !plan.allows(Feature::ActivityLog) {
            return Err(ApiError::PlanUpgradeRequired {
                feature: Feature::ActivityLog,
                plan,
            });
        }

        let mut filter = FilterData::default()
            .order_by("created_at desc")
            .paginate(Some(self.config.page_limit(limit)?), offset);
        if let Some(user_id) = user_id {
            filter.where_clause = Some(json!({ "user_id": user_id.to_string() }));
        }

        Ok(self
            .store
            .find(Collection::ActivityLogs, Scope::Organization(actor.organization_id), &filter)
            .await?)
    }
}
