use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::database::{Collection, Document, DocumentStore, Scope};
use crate::observer::error::{ObserverError, ObserverWarning};
use crate::observer::traits::ObserverRing;
use crate::plans::Plan;
use crate::types::{Actor, Operation};

/// State flowing through the observer pipeline for one record operation
pub struct ObserverContext {
    pub operation: Operation,
    pub collection: Collection,
    pub actor: Actor,
    pub plan: Plan,

    /// Target of update/delete
    pub record_id: Option<Uuid>,

    /// Client body for create, changed fields for update; observers add to it
    pub changes: Map<String, Value>,

    /// Stored record before the operation (Ring 0)
    pub existing: Option<Document>,

    /// Stored record after the operation (Ring 5)
    pub result: Option<Document>,

    pub store: Arc<dyn DocumentStore>,

    pub start_time: Instant,
    pub current_ring: Option<ObserverRing>,
    pub errors: Vec<ObserverError>,
    pub warnings: Vec<ObserverWarning>,
}

impl ObserverContext {
    pub fn new(
        operation: Operation,
        collection: Collection,
        actor: Actor,
        plan: Plan,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            operation,
            collection,
            actor,
            plan,
            record_id: None,
            changes: Map::new(),
            existing: None,
            result: None,
            store,
            start_time: Instant::now(),
            current_ring: None,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn with_record(mut self, id: Uuid) -> Self {
        self.record_id = Some(id);
        self
    }

    pub fn with_changes(mut self, changes: Map<String, Value>) -> Self {
        self.changes = changes;
        self
    }

    /// Every read and write happens inside the actor's organization
    pub fn scope(&self) -> Scope {
        Scope::Organization(self.actor.organization_id)
    }

    /// Value a field will have after the operation: pending change first, then stored body
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self.changes.get(name) {
            Some(v) => Some(v),
            None => self.existing.as_ref().and_then(|d| d.get(name)),
        }
    }

    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    pub fn field_uuid(&self, name: &str) -> Option<Uuid> {
        self.field_str(name).and_then(|s| Uuid::parse_str(s).ok())
    }

    /// True when the operation sets `name` to something other than its stored value
    pub fn changed(&self, name: &str) -> bool {
        match (self.changes.get(name), self.existing.as_ref()) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(new), Some(doc)) => doc.get(name) != Some(new),
        }
    }

    /// The record as it will look after the operation (the deleted record for deletes)
    pub fn merged(&self) -> Map<String, Value> {
        let mut out = self.existing.as_ref().map(|d| d.body.clone()).unwrap_or_default();
        for (k, v) in &self.changes {
            out.insert(k.clone(), v.clone());
        }
        out
    }

    /// Sets a value only when neither the change set nor the stored record has one
    pub fn set_default(&mut self, name: &str, value: Value) {
        if self.field(name).map_or(true, Value::is_null) {
            self.changes.insert(name.to_string(), value);
        }
    }

    pub fn add_error(&mut self, error: ObserverError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ObserverWarning) {
        self.warnings.push(warning);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn execution_time(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}
