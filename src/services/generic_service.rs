//! CRUD over the collections served by `/api/data/:collection`.
//!
//! Every write goes through the observer pipeline; reads apply the role
//! policy and, for tenant-role users, narrow results to their own records.

use std::sync::Arc;

use serde_json::{json, Map, Number, Value};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::database::store::strip_system_fields;
use crate::database::{Collection, Document, DocumentStore};
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::observer::{ObserverContext, ObserverPipeline};
use crate::plans::Plan;
use crate::state::AppState;
use crate::types::{Actor, Operation, Role};

const MANAGERS: &[Role] = &[Role::Owner, Role::Admin, Role::Manager];
const OPERATORS: &[Role] = &[Role::Owner, Role::Admin, Role::Manager, Role::Staff];
const ADMINS: &[Role] = &[Role::Owner, Role::Admin];

/// Fields the server assigns; clients cannot set them
const SERVER_OWNED_FIELDS: [&str; 3] = ["created_by", "sender_id", "read"];

/// Roles allowed to perform `operation` on `collection`
pub fn write_roles(collection: Collection, operation: Operation) -> &'static [Role] {
    match (collection, operation) {
        (Collection::Payments, _) => OPERATORS,
        (Collection::Tickets, Operation::Create) => &Role::ALL,
        (Collection::Tickets, Operation::Update) => OPERATORS,
        (Collection::Tickets, Operation::Delete) => ADMINS,
        (Collection::Messages, Operation::Create) => &Role::ALL,
        (Collection::Messages, _) => ADMINS,
        _ => MANAGERS,
    }
}

pub fn can_write(collection: Collection, operation: Operation, role: Role) -> bool {
    role.is_one_of(write_roles(collection, operation))
}

/// Extra WHERE restricting what a tenant-role user may read; `None` for staff roles
pub fn tenant_read_filter(actor: &Actor, collection: Collection) -> Result<Option<Value>, ApiError> {
    if actor.role != Role::Tenant {
        return Ok(None);
    }

    // An unlinked tenant user matches nothing
    let tenant = actor
        .tenant_id
        .map(|id| json!({ "tenant_id": id.to_string() }))
        .unwrap_or_else(|| json!({ "tenant_id": { "$in": [] } }));
    let user = actor.user_id.to_string();

    match collection {
        Collection::Leases | Collection::Payments => Ok(Some(tenant)),
        Collection::Tickets => Ok(Some(json!({ "$or": [tenant, { "created_by": user }] }))),
        Collection::Messages => Ok(Some(json!({ "$or": [{ "sender_id": user }, { "recipient_id": user }] }))),
        other => Err(ApiError::forbidden(format!("Tenant accounts cannot access {}", other))),
    }
}

/// Combines two optional WHERE documents with `$and`
pub fn and_where(left: Option<Value>, right: Option<Value>) -> Option<Value> {
    match (left, right) {
        (Some(l), Some(r)) => Some(json!({ "$and": [l, r] })),
        (l, r) => l.or(r),
    }
}

/// Values a suite or floor number may be stored as: `"101"` and `101` are the same suite
pub fn build_suite_matches(value: &Value) -> Vec<Value> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return vec![];
            }
            let mut matches = vec![Value::String(trimmed.to_string())];
            if let Some(number) = parse_number(trimmed) {
                matches.push(number);
            }
            matches
        }
        Value::Number(n) => vec![Value::Number(n.clone()), Value::String(n.to_string())],
        _ => vec![],
    }
}

fn parse_number(s: &str) -> Option<Value> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    s.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(Number::from_f64)
        .map(Value::Number)
}

/// Escapes LIKE wildcards so the pattern matches literally
pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// WHERE matching records that would duplicate `record`; `None` when nothing to check
pub fn duplicate_filter(collection: Collection, record: &Map<String, Value>, exclude: Option<Uuid>) -> Option<Value> {
    let mut filter = match collection {
        Collection::Buildings => {
            let name = record.get("name")?.as_str()?.trim();
            if name.is_empty() {
                return None;
            }
            json!({ "name": { "$ilike": escape_like(name) } })
        }
        Collection::Floors => {
            let building_id = record.get("building_id")?.as_str()?;
            let matches = build_suite_matches(record.get("floor_number")?);
            if matches.is_empty() {
                return None;
            }
            json!({ "building_id": building_id, "floor_number": { "$in": matches } })
        }
        Collection::Suites => {
            let floor_id = record.get("floor_id")?.as_str()?;
            let matches = build_suite_matches(record.get("suite_number")?);
            if matches.is_empty() {
                return None;
            }
            json!({ "floor_id": floor_id, "suite_number": { "$in": matches } })
        }
        _ => return None,
    };

    if let (Some(id), Value::Object(obj)) = (exclude, &mut filter) {
        obj.insert("id".to_string(), json!({ "$ne": id.to_string() }));
    }
    Some(filter)
}

pub struct GenericService {
    config: Arc<AppConfig>,
    store: Arc<dyn DocumentStore>,
    pipeline: Arc<ObserverPipeline>,
}

impl GenericService {
    pub fn new(state: &AppState) -> Self {
        Self {
            config: state.config.clone(),
            store: state.store.clone(),
            pipeline: state.pipeline.clone(),
        }
    }

    pub fn collection(name: &str) -> Result<Collection, ApiError> {
        match name.parse::<Collection>() {
            Ok(c) if c.is_generic() => Ok(c),
            _ => Err(ApiError::not_found(format!("Unknown collection '{}'", name))),
        }
    }

    pub async fn list(&self, actor: &Actor, collection: Collection, mut data: FilterData) -> Result<Vec<Document>, ApiError> {
        let restriction = tenant_read_filter(actor, collection)?;
        data.where_clause = and_where(data.where_clause.take().filter(|w| !w.is_null()), restriction);
        data.limit = Some(self.config.page_limit(data.limit)?);

        tracing::debug!(collection = %collection, user_id = %actor.user_id, "list");
        Ok(self.store.find(collection, scope(actor), &data).await?)
    }

    pub async fn get(&self, actor: &Actor, collection: Collection, id: Uuid) -> Result<Document, ApiError> {
        let restriction = tenant_read_filter(actor, collection)?;
        let where_clause = and_where(Some(json!({ "id": id.to_string() })), restriction).unwrap_or(Value::Null);
        self.store
            .find_one(collection, scope(actor), where_clause)
            .await?
            .ok_or_else(|| ApiError::not_found(collection.not_found_message()))
    }

    pub async fn create(&self, actor: &Actor, plan: Plan, collection: Collection, body: Value) -> Result<Document, ApiError> {
        authorize_write(actor, collection, Operation::Create)?;
        let changes = client_fields(body)?;

        let ctx = ObserverContext::new(Operation::Create, collection, *actor, plan, self.store.clone()).with_changes(changes);
        let doc = self.pipeline.execute(ctx).await?;
        tracing::info!(collection = %collection, id = %doc.id, user_id = %actor.user_id, "Record created");
        Ok(doc)
    }

    pub async fn update(
        &self,
        actor: &Actor,
        plan: Plan,
        collection: Collection,
        id: Uuid,
        body: Value,
    ) -> Result<Document, ApiError> {
        authorize_write(actor, collection, Operation::Update)?;
        let changes = client_fields(body)?;

        let ctx = ObserverContext::new(Operation::Update, collection, *actor, plan, self.store.clone())
            .with_record(id)
            .with_changes(changes);
        let doc = self.pipeline.execute(ctx).await?;
        tracing::info!(collection = %collection, id = %doc.id, user_id = %actor.user_id, "Record updated");
        Ok(doc)
    }

    pub async fn delete(&self, actor: &Actor, plan: Plan, collection: Collection, id: Uuid) -> Result<Document, ApiError> {
        authorize_write(actor, collection, Operation::Delete)?;

        let ctx = ObserverContext::new(Operation::Delete, collection, *actor, plan, self.store.clone()).with_record(id);
        let doc = self.pipeline.execute(ctx).await?;
        tracing::info!(collection = %collection, id = %doc.id, user_id = %actor.user_id, "Record deleted");
        Ok(doc)
    }
}

fn scope(actor: &Actor) -> crate::database::Scope {
    crate::database::Scope::Organization(actor.organization_id)
}

fn authorize_write(actor: &Actor, collection: Collection, operation: Operation) -> Result<(), ApiError> {
    if can_write(collection, operation, actor.role) {
        return Ok(());
    }
    Err(ApiError::forbidden(format!(
        "Role '{}' cannot {} {}",
        actor.role,
        operation.as_str(),
        collection
    )))
}

/// Client body as a field map without system or server-owned fields
fn client_fields(body: Value) -> Result<Map<String, Value>, ApiError> {
    let Value::Object(mut fields) = body else {
        return Err(ApiError::bad_request("Request body must be a JSON object"));
    };
    strip_system_fields(&mut fields);
    for field in SERVER_OWNED_FIELDS {
        fields.remove(field);
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role, tenant_id: Option<Uuid>) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            role,
            tenant_id,
        }
    }

    #[test]
    fn suite_matches_cover_numeric_and_string_forms() {
        assert_eq!(build_suite_matches(&json!("101")), vec![json!("101"), json!(101)]);
        assert_eq!(build_suite_matches(&json!(101)), vec![json!(101), json!("101")]);
        assert_eq!(build_suite_matches(&json!("12.5")), vec![json!("12.5"), json!(12.5)]);
        assert_eq!(build_suite_matches(&json!("A1")), vec![json!("A1")]);
        assert_eq!(build_suite_matches(&json!("  7 ")), vec![json!("7"), json!(7)]);
    }

    #[test]
    fn suite_matches_ignore_unusable_values() {
        for value in [json!(""), json!("   "), json!(null), json!(true), json!([101]), json!({"n": 1})] {
            assert!(build_suite_matches(&value).is_empty(), "{}", value);
        }
    }

    #[test]
    fn duplicate_filters_per_collection() {
        let building = json!({"name": "50% Tower"}).as_object().cloned().unwrap();
        assert_eq!(
            duplicate_filter(Collection::Buildings, &building, None),
            Some(json!({"name": {"$ilike": "50\\% Tower"}}))
        );

        let id = Uuid::new_v4();
        let suite = json!({"floor_id": "f1", "suite_number": "101"}).as_object().cloned().unwrap();
        assert_eq!(
            duplicate_filter(Collection::Suites, &suite, Some(id)),
            Some(json!({"floor_id": "f1", "suite_number": {"$in": ["101", 101]}, "id": {"$ne": id.to_string()}}))
        );

        let floor = json!({"building_id": "b1", "floor_number": 3}).as_object().cloned().unwrap();
        assert_eq!(
            duplicate_filter(Collection::Floors, &floor, None),
            Some(json!({"building_id": "b1", "floor_number": {"$in": [3, "3"]}}))
        );

        let floor = json!({"building_id": "b1"}).as_object().cloned().unwrap();
        assert_eq!(duplicate_filter(Collection::Floors, &floor, None), None);
        assert_eq!(duplicate_filter(Collection::Tickets, &suite, None), None);
    }

    #[test]
    fn write_policy_by_role() {
        assert!(can_write(Collection::Buildings, Operation::Create, Role::Manager));
        assert!(!can_write(Collection::Buildings, Operation::Create, Role::Staff));
        assert!(can_write(Collection::Payments, Operation::Update, Role::Staff));
        assert!(can_write(Collection::Tickets, Operation::Create, Role::Tenant));
        assert!(!can_write(Collection::Tickets, Operation::Update, Role::Tenant));
        assert!(!can_write(Collection::Tickets, Operation::Delete, Role::Manager));
        assert!(can_write(Collection::Messages, Operation::Create, Role::Tenant));
        assert!(!can_write(Collection::Messages, Operation::Delete, Role::Staff));
    }

    #[test]
    fn tenant_users_only_read_their_records() {
        let staff = actor(Role::Staff, None);
        assert_eq!(tenant_read_filter(&staff, Collection::Buildings).unwrap(), None);

        let tenant_id = Uuid::new_v4();
        let tenant = actor(Role::Tenant, Some(tenant_id));
        assert_eq!(
            tenant_read_filter(&tenant, Collection::Leases).unwrap(),
            Some(json!({"tenant_id": tenant_id.to_string()}))
        );
        assert!(tenant_read_filter(&tenant, Collection::Buildings).is_err());

        let unlinked = actor(Role::Tenant, None);
        assert_eq!(
            tenant_read_filter(&unlinked, Collection::Payments).unwrap(),
            Some(json!({"tenant_id": {"$in": []}}))
        );
    }

    #[test]
    fn client_fields_drop_system_and_server_owned_fields() {
        let fields = client_fields(json!({"id": "x", "created_by": "y", "name": "Maple"})).unwrap();
        assert_eq!(Value::Object(fields), json!({"name": "Maple"}));
        let fields = client_fields(json!({"body": "hi", "sender_id": "z", "read": true})).unwrap();
        assert_eq!(Value::Object(fields), json!({"body": "hi"}));
        assert!(client_fields(json!([1, 2])).is_err());
    }
}
