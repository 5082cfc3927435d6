use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::collection::Collection;
use super::manager::DatabaseError;
use crate::filter::{FilterData, SYSTEM_FIELDS};

/// Body fields never returned to clients
pub const HIDDEN_FIELDS: [&str; 1] = ["password_hash"];

/// Visibility boundary for a store operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Organization(Uuid),
    /// Cross-organization access, used for login and registration lookups
    Global,
}

impl Scope {
    pub fn admits(&self, organization_id: Option<Uuid>) -> bool {
        match self {
            Scope::Organization(id) => organization_id == Some(*id),
            Scope::Global => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub collection: Collection,
    pub organization_id: Option<Uuid>,
    pub body: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.body.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.body.get(field).and_then(Value::as_str)
    }

    pub fn get_uuid(&self, field: &str) -> Option<Uuid> {
        self.get_str(field).and_then(|s| Uuid::parse_str(s).ok())
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.body.get(field).and_then(Value::as_bool)
    }

    /// Body merged with the system fields; the shape filters are evaluated against
    pub fn flatten(&self) -> Map<String, Value> {
        let mut out = self.body.clone();
        out.insert("id".into(), Value::String(self.id.to_string()));
        out.insert(
            "organization_id".into(),
            self.organization_id.map(|id| Value::String(id.to_string())).unwrap_or(Value::Null),
        );
        out.insert("created_at".into(), Value::String(format_timestamp(&self.created_at)));
        out.insert("updated_at".into(), Value::String(format_timestamp(&self.updated_at)));
        out
    }

    /// Client representation
    pub fn to_json(&self) -> Value {
        let mut out = self.flatten();
        for hidden in HIDDEN_FIELDS {
            out.remove(hidden);
        }
        Value::Object(out)
    }
}

/// A document about to be inserted
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub id: Uuid,
    pub organization_id: Option<Uuid>,
    pub body: Map<String, Value>,
}

impl NewDocument {
    pub fn new(organization_id: Uuid, body: Map<String, Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id: Some(organization_id),
            body,
        }
    }

    /// An organization document scoped to itself
    pub fn organization(body: Map<String, Value>) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            organization_id: Some(id),
            body,
        }
    }
}

/// Removes system fields from a client supplied body
pub fn strip_system_fields(body: &mut Map<String, Value>) {
    for field in SYSTEM_FIELDS {
        body.remove(field);
    }
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current time at the precision Postgres stores
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Persistence for collection documents
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, collection: Collection, document: NewDocument) -> Result<Document, DatabaseError>;

    async fn find(&self, collection: Collection, scope: Scope, filter: &FilterData) -> Result<Vec<Document>, DatabaseError>;

    async fn find_by_id(&self, collection: Collection, scope: Scope, id: Uuid) -> Result<Option<Document>, DatabaseError>;

    async fn find_one(&self, collection: Collection, scope: Scope, where_clause: Value) -> Result<Option<Document>, DatabaseError> {
        let filter = FilterData::with_where(where_clause).paginate(Some(1), None);
        Ok(self.find(collection, scope, &filter).await?.into_iter().next())
    }

    /// Shallow merge of `changes` into the body; `None` when no such document
    async fn update(
        &self,
        collection: Collection,
        scope: Scope,
        id: Uuid,
        changes: Map<String, Value>,
    ) -> Result<Option<Document>, DatabaseError>;

    async fn delete(&self, collection: Collection, scope: Scope, id: Uuid) -> Result<Option<Document>, DatabaseError>;

    async fn count(&self, collection: Collection, scope: Scope, where_clause: Option<Value>) -> Result<u64, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_json_flattens_and_hides_secrets() {
        let org = Uuid::new_v4();
        let doc = Document {
            id: Uuid::new_v4(),
            collection: Collection::Users,
            organization_id: Some(org),
            body: json!({"email": "a@b.co", "password_hash": "x", "id": "spoofed"}).as_object().cloned().unwrap(),
            created_at: now(),
            updated_at: now(),
        };
        let out = doc.to_json();
        assert_eq!(out["email"], "a@b.co");
        assert_eq!(out["id"], doc.id.to_string());
        assert_eq!(out["organization_id"], org.to_string());
        assert!(out.get("password_hash").is_none());
    }

    #[test]
    fn system_fields_are_stripped() {
        let mut body = json!({"id": "x", "organization_id": "y", "created_at": "z", "name": "Maple"})
            .as_object()
            .cloned()
            .unwrap();
        strip_system_fields(&mut body);
        assert_eq!(Value::Object(body), json!({"name": "Maple"}));
    }

    #[test]
    fn scopes_admit_only_their_organization() {
        let org = Uuid::new_v4();
        assert!(Scope::Organization(org).admits(Some(org)));
        assert!(!Scope::Organization(org).admits(Some(Uuid::new_v4())));
        assert!(!Scope::Organization(org).admits(None));
        assert!(Scope::Global.admits(None));
    }
}
